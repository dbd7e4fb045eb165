//! # Database Migrations Module
//!
//! Versioned SQL migrations applied in order, recorded in a checksummed
//! ledger, and reversible with down-scripts.
//!
//! # Design Principles
//!
//! 1. **Ordered**: Migrations apply in ascending version order and roll back in descending order
//! 2. **Checksummed**: SHA-256 of each file is recorded; edits after apply are fatal
//! 3. **Transactional**: Each migration commits on its own; nothing is recorded unless it committed
//! 4. **Fail-fast**: The first failure stops the run
//! 5. **Tracked**: The `schema_migrations` table is the only record of what was applied
//!
//! # Migration File Format
//!
//! ```text
//! migrations/
//!   V1__create_users.sql
//!   V1.5__add_email_index.sql
//!   V2__create_orders.sql
//!   down/
//!     V1.5__add_email_index.sql
//!     V2__create_orders.sql
//! ```
//!
//! Down-scripts use the same name and version as the forward migration
//! they reverse.
//!
//! # Usage
//!
//! ```bash
//! schema-ledger --config migrate.toml init                 # Create the registry table
//! schema-ledger --config migrate.toml up                   # Apply pending migrations
//! schema-ledger --config migrate.toml down --target V1     # Roll back everything after V1
//! schema-ledger --config migrate.toml status               # Show migration status
//! schema-ledger --config migrate.toml new --file draft.sql # Add a versioned migration
//! ```

pub mod adapters;
pub mod checksum;
pub mod errors;
pub mod generator;
pub mod registry;
pub mod rollback;
pub mod runner;
pub mod scanner;
pub mod version;

pub use errors::{MigrationError, MigrationResult};
pub use registry::MigrationRegistry;
pub use rollback::{MigrationRollback, RollbackPhase, RollbackReport};
pub use runner::{MigrationRunReport, MigrationRunner, MigrationStatusReport};
pub use scanner::MigrationScanner;
pub use version::{VersionId, VersionManager};

use std::fs;
use std::path::PathBuf;

/// Status recorded for a successfully applied migration
pub const STATUS_APPLIED: &str = "Applied";

/// A migration file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Version parsed from the filename
    pub version: VersionId,

    /// Description from the filename, underscores removed
    pub description: String,

    /// File name without directories
    pub filename: String,

    /// Full path on disk
    pub path: PathBuf,

    /// SHA-256 of the raw file bytes, lowercase hex
    pub checksum: String,
}

impl MigrationFile {
    /// Read the full SQL text
    pub fn read_sql(&self) -> MigrationResult<String> {
        fs::read_to_string(&self.path).map_err(|e| MigrationError::FileRead {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::registry::MigrationRegistry;
    use crate::config::{DatabaseConfig, SqliteParams};

    /// A scratch workspace with a SQLite database and migration directories
    pub struct Workspace {
        pub temp_dir: TempDir,
        pub migrations_dir: PathBuf,
        pub down_dir: PathBuf,
    }

    impl Workspace {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let migrations_dir = temp_dir.path().join("migrations");
            let down_dir = migrations_dir.join("down");
            fs::create_dir_all(&down_dir).unwrap();
            Self {
                temp_dir,
                migrations_dir,
                down_dir,
            }
        }

        pub fn database(&self) -> DatabaseConfig {
            DatabaseConfig::Sqlite(SqliteParams {
                path: self.temp_dir.path().join("ledger.db"),
            })
        }

        pub fn registry(&self) -> MigrationRegistry {
            let registry = MigrationRegistry::new(self.database());
            registry.initialize().unwrap();
            registry
        }

        pub fn write_up(&self, name: &str, sql: &str) {
            write(&self.migrations_dir, name, sql);
        }

        pub fn write_down(&self, name: &str, sql: &str) {
            write(&self.down_dir, name, sql);
        }

        /// Names of tables in the target database, sorted
        pub fn tables(&self) -> Vec<String> {
            let mut conn = crate::db::connect(&self.database()).unwrap();
            let rows = conn
                .query_pairs(
                    "SELECT name, type FROM sqlite_master WHERE type = 'table' \
                     AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .unwrap();
            conn.rollback().unwrap();
            rows.into_iter().map(|(name, _)| name).collect()
        }
    }

    fn write(dir: &Path, name: &str, sql: &str) {
        fs::write(dir.join(name), sql).unwrap();
    }
}
