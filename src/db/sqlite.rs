//! Embedded SQLite backend.

use std::time::Duration;

use rusqlite::types::{ToSql, ToSqlOutput};

use super::{Connection, DbResult, SqlValue};
use crate::config::SqliteParams;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
        })
    }
}

/// Connection to a SQLite database file
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    in_transaction: bool,
}

impl SqliteConnection {
    pub fn open(params: &SqliteParams) -> DbResult<Self> {
        let conn = rusqlite::Connection::open(&params.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    fn begin(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.begin()?;
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        self.begin()?;
        let affected = self
            .conn
            .execute(sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn query_pairs(&mut self, sql: &str) -> DbResult<Vec<(String, String)>> {
        self.begin()?;
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn commit(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            if !self.conn.is_autocommit() {
                self.conn.execute_batch("COMMIT")?;
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            // SQLite may already have rolled back on its own after an error.
            if !self.conn.is_autocommit() {
                self.conn.execute_batch("ROLLBACK")?;
            }
        }
        Ok(())
    }
}
