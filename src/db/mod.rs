//! # Database Connections
//!
//! The migration engine talks to a target database only through the
//! [`Connection`] trait: execute a script, execute one parameterized
//! statement, read two-column rows, commit, roll back.
//!
//! Connections always run in manual-commit mode. A transaction is opened
//! implicitly by the first statement after a commit or rollback, so nothing
//! becomes durable until [`Connection::commit`] is called.
//!
//! Connections are never pooled. [`connect`] opens a fresh one for every
//! unit of work and dropping it closes it.

use thiserror::Error;
use tracing::warn;

use crate::config::DatabaseConfig;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by a database backend
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] ::postgres::Error),

    #[cfg(feature = "mysql")]
    #[error("mysql error: {0}")]
    MySql(#[from] ::mysql::Error),

    /// The configured backend was not compiled into this build
    #[error("backend '{backend}' is not available; rebuild with the '{feature}' feature")]
    BackendUnavailable {
        backend: &'static str,
        feature: &'static str,
    },
}

/// A bound statement parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

/// An open connection to the target database
pub trait Connection {
    /// Execute a script of one or more statements
    fn execute_batch(&mut self, sql: &str) -> DbResult<()>;

    /// Execute one parameterized statement, returning the affected row count
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64>;

    /// Run a query whose rows are two text columns
    fn query_pairs(&mut self, sql: &str) -> DbResult<Vec<(String, String)>>;

    /// Make everything since the last commit or rollback durable
    fn commit(&mut self) -> DbResult<()>;

    /// Discard everything since the last commit or rollback
    fn rollback(&mut self) -> DbResult<()>;
}

/// Open a new connection for the configured backend
pub fn connect(config: &DatabaseConfig) -> DbResult<Box<dyn Connection>> {
    match config {
        DatabaseConfig::Sqlite(params) => Ok(Box::new(sqlite::SqliteConnection::open(params)?)),

        #[cfg(feature = "postgres")]
        DatabaseConfig::Postgresql(params) => Ok(Box::new(self::postgres::PgConnection::connect(
            params,
            config.port().unwrap_or(5432),
        )?)),
        #[cfg(not(feature = "postgres"))]
        DatabaseConfig::Postgresql(_) => Err(DbError::BackendUnavailable {
            backend: "postgresql",
            feature: "postgres",
        }),

        #[cfg(feature = "mysql")]
        DatabaseConfig::Mysql(params) => Ok(Box::new(self::mysql::MySqlConnection::connect(
            params,
            config.port().unwrap_or(3306),
        )?)),
        #[cfg(not(feature = "mysql"))]
        DatabaseConfig::Mysql(_) => Err(DbError::BackendUnavailable {
            backend: "mysql",
            feature: "mysql",
        }),
    }
}

/// Run `work` as one transaction: commit on success, roll back on failure.
///
/// A failed rollback is logged and the original error is returned.
pub fn transactional<T, F>(conn: &mut dyn Connection, work: F) -> DbResult<T>
where
    F: FnOnce(&mut dyn Connection) -> DbResult<T>,
{
    match work(conn) {
        Ok(value) => {
            if let Err(e) = conn.commit() {
                rollback_quietly(conn);
                return Err(e);
            }
            Ok(value)
        }
        Err(e) => {
            rollback_quietly(conn);
            Err(e)
        }
    }
}

/// Roll back, logging instead of returning a failure
pub fn rollback_quietly(conn: &mut dyn Connection) {
    if let Err(e) = conn.rollback() {
        warn!(error = %e, "Rollback failed");
    }
}
