//! PostgreSQL backend (`postgres` feature).

use ::postgres::types::ToSql;
use ::postgres::{Client, NoTls};

use super::{Connection, DbResult, SqlValue};
use crate::config::ServerParams;

/// Connection to a PostgreSQL server
pub struct PgConnection {
    client: Client,
    in_transaction: bool,
}

impl PgConnection {
    pub fn connect(params: &ServerParams, port: u16) -> DbResult<Self> {
        let client = ::postgres::Config::new()
            .host(&params.host)
            .port(port)
            .user(&params.user)
            .password(&params.password)
            .dbname(&params.dbname)
            .connect(NoTls)?;
        Ok(Self {
            client,
            in_transaction: false,
        })
    }

    fn begin(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.client.batch_execute("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Connection for PgConnection {
    fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.begin()?;
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        self.begin()?;
        let bound: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| match p {
                SqlValue::Text(s) => s as &(dyn ToSql + Sync),
                SqlValue::Integer(i) => i as &(dyn ToSql + Sync),
            })
            .collect();
        Ok(self.client.execute(sql, &bound)?)
    }

    fn query_pairs(&mut self, sql: &str) -> DbResult<Vec<(String, String)>> {
        self.begin()?;
        let mut pairs = Vec::new();
        for row in self.client.query(sql, &[])? {
            pairs.push((row.try_get::<_, String>(0)?, row.try_get::<_, String>(1)?));
        }
        Ok(pairs)
    }

    fn commit(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("ROLLBACK")?;
        }
        Ok(())
    }
}
