//! # Registry Adapters
//!
//! Each backend supplies the SQL text for the `schema_migrations` ledger:
//! primary key style, placeholder syntax and how `executed_at` is filled.
//! The observable contract is identical across backends:
//!
//! - `initialize_registry` creates the table if absent and is a no-op otherwise
//! - `record_migration` always inserts; replays are prevented by the runner
//! - `get_applied_migrations` returns `(version, checksum)` pairs

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use crate::config::Backend;
use crate::db::{Connection, DbResult, SqlValue};

use super::MigrationFile;

/// Name of the registry table
pub const REGISTRY_TABLE: &str = "schema_migrations";

/// SQL text for one backend
#[derive(Debug, Clone, Copy)]
pub struct SqlTemplates {
    /// Idempotent `CREATE TABLE IF NOT EXISTS`
    pub create_registry: &'static str,
    /// Insert of one ledger row with seven bound values
    pub record_migration: &'static str,
    /// Select `(version, checksum)` for every row
    pub applied_migrations: &'static str,
    /// Delete prefix, completed with a placeholder list
    pub delete_versions: &'static str,
}

/// Backend-specific registry SQL
pub trait Adapter: Send + Sync {
    /// Backend this adapter speaks to
    fn backend(&self) -> Backend;

    /// SQL templates for this backend
    fn templates(&self) -> &SqlTemplates;

    /// Bound-parameter placeholder for the 1-based `index`
    fn placeholder(&self, index: usize) -> String;

    /// Create the registry table if it does not exist
    fn initialize_registry(&self, conn: &mut dyn Connection) -> DbResult<()> {
        conn.execute_batch(self.templates().create_registry)
    }

    /// Insert one ledger row
    fn record_migration(
        &self,
        conn: &mut dyn Connection,
        migration: &MigrationFile,
        execution_time_ms: i64,
        status: &str,
        applied_by: &str,
    ) -> DbResult<()> {
        let params = [
            SqlValue::from(migration.version.to_string()),
            SqlValue::from(migration.description.as_str()),
            SqlValue::from(migration.filename.as_str()),
            SqlValue::from(migration.checksum.as_str()),
            SqlValue::from(execution_time_ms),
            SqlValue::from(status),
            SqlValue::from(applied_by),
        ];
        conn.execute(self.templates().record_migration, &params)?;
        Ok(())
    }

    /// Read `(version, checksum)` for every applied migration
    fn get_applied_migrations(&self, conn: &mut dyn Connection) -> DbResult<Vec<(String, String)>> {
        conn.query_pairs(self.templates().applied_migrations)
    }

    /// Delete the given versions in one statement
    fn remove_migrations(&self, conn: &mut dyn Connection, versions: &[String]) -> DbResult<u64> {
        if versions.is_empty() {
            return Ok(0);
        }

        let placeholders = (1..=versions.len())
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("{} ({})", self.templates().delete_versions, placeholders);
        let params: Vec<SqlValue> = versions.iter().map(|v| SqlValue::from(v.as_str())).collect();

        conn.execute(&sql, &params)
    }
}

/// Select the adapter for a backend
pub fn adapter_for(backend: Backend) -> Box<dyn Adapter> {
    match backend {
        Backend::Postgresql => Box::new(PostgresAdapter),
        Backend::Mysql => Box::new(MySqlAdapter),
        Backend::Sqlite => Box::new(SqliteAdapter),
    }
}
