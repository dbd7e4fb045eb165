//! MySQL backend (`mysql` feature).

use ::mysql::prelude::Queryable;
use ::mysql::{Conn, OptsBuilder, Params, Value};

use super::{Connection, DbResult, SqlValue};
use crate::config::ServerParams;

/// Connection to a MySQL server
pub struct MySqlConnection {
    conn: Conn,
    in_transaction: bool,
}

impl MySqlConnection {
    pub fn connect(params: &ServerParams, port: u16) -> DbResult<Self> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(params.host.clone()))
            .tcp_port(port)
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()))
            .db_name(Some(params.dbname.clone()));
        let conn = Conn::new(opts)?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    fn begin(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.conn.query_drop("START TRANSACTION")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Connection for MySqlConnection {
    fn execute_batch(&mut self, sql: &str) -> DbResult<()> {
        self.begin()?;
        self.conn.query_drop(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        self.begin()?;
        let bound: Vec<Value> = params
            .iter()
            .map(|p| match p {
                SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
                SqlValue::Integer(i) => Value::Int(*i),
            })
            .collect();
        self.conn.exec_drop(sql, Params::Positional(bound))?;
        Ok(self.conn.affected_rows())
    }

    fn query_pairs(&mut self, sql: &str) -> DbResult<Vec<(String, String)>> {
        self.begin()?;
        let rows: Vec<(String, String)> = self.conn.query(sql)?;
        Ok(rows)
    }

    fn commit(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.query_drop("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.query_drop("ROLLBACK")?;
        }
        Ok(())
    }
}
