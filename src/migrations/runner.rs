//! # Migration Runner
//!
//! Orchestrates forward migrations:
//! - Pending set computed by diffing the migration directory against the registry
//! - Checksum drift checked for the whole batch before anything runs
//! - Ascending version order, one transaction per migration
//! - Fail-fast: the first failure stops the run and is never recorded

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use super::errors::{MigrationError, MigrationResult};
use super::registry::MigrationRegistry;
use super::scanner::MigrationScanner;
use super::version::VersionId;
use super::{MigrationFile, STATUS_APPLIED};
use crate::config::MigrateConfig;
use crate::db::{rollback_quietly, Connection};

/// Migration runner
pub struct MigrationRunner {
    scanner: MigrationScanner,
    registry: MigrationRegistry,
}

impl MigrationRunner {
    /// Create a runner over `migrations_dir` recording into `registry`
    pub fn new(migrations_dir: impl Into<PathBuf>, registry: MigrationRegistry) -> Self {
        Self {
            scanner: MigrationScanner::new(migrations_dir),
            registry,
        }
    }

    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(
            config.migrations_dir.clone(),
            MigrationRegistry::from_config(config),
        )
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Applied versions and their recorded checksums
    pub fn get_applied_migrations(&self) -> MigrationResult<BTreeMap<VersionId, String>> {
        self.registry.get_applied_migrations()
    }

    /// Migrations on disk that are not yet recorded, in ascending order.
    ///
    /// Fails with `ChecksumDrift` if any recorded migration's file changed.
    pub fn get_migrations_to_apply(&self) -> MigrationResult<Vec<MigrationFile>> {
        let migration_files = self.scanner.discover_migrations()?;
        if migration_files.is_empty() {
            return Err(MigrationError::NoMigrationFilesFound {
                path: self.scanner.migration_dir().to_path_buf(),
            });
        }

        let applied = self.get_applied_migrations()?;
        let mut to_apply = Vec::new();

        for migration in migration_files {
            match applied.get(&migration.version) {
                Some(recorded) if *recorded != migration.checksum => {
                    warn!(
                        version = %migration.version,
                        file = %migration.filename,
                        "Applied migration has been modified"
                    );
                    return Err(MigrationError::ChecksumDrift {
                        version: migration.version,
                        expected: recorded.clone(),
                        actual: migration.checksum,
                    });
                }
                Some(_) => {}
                None => to_apply.push(migration),
            }
        }

        Ok(to_apply)
    }

    /// Apply all pending migrations.
    ///
    /// Each migration runs and commits on a single run-wide connection and is
    /// then recorded as `Applied` through the registry. The first failure
    /// rolls back that migration and ends the run.
    pub fn run_migrations(&self) -> MigrationResult<MigrationRunReport> {
        let pending = self.get_migrations_to_apply()?;
        if pending.is_empty() {
            return Err(MigrationError::NothingToApply);
        }

        info!(count = pending.len(), "Applying pending migrations");

        let mut conn = self.registry.get_connection()?;
        let mut applied = Vec::with_capacity(pending.len());

        for migration in &pending {
            let duration_ms = self.apply_migration(conn.as_mut(), migration)?;
            self.registry
                .record_migration(migration, duration_ms as i64, STATUS_APPLIED)?;

            info!(
                version = %migration.version,
                file = %migration.filename,
                duration_ms,
                "Applied migration"
            );
            applied.push(AppliedMigration {
                version: migration.version.clone(),
                description: migration.description.clone(),
                duration_ms,
            });
        }

        Ok(MigrationRunReport { applied })
    }

    /// Execute and commit a single migration, returning its duration
    fn apply_migration(
        &self,
        conn: &mut dyn Connection,
        migration: &MigrationFile,
    ) -> MigrationResult<u64> {
        let sql = migration.read_sql()?;

        let start = Instant::now();
        let result = conn.execute_batch(&sql).and_then(|_| conn.commit());
        let duration_ms = start.elapsed().as_millis() as u64;

        if let Err(source) = result {
            rollback_quietly(conn);
            warn!(
                version = %migration.version,
                file = %migration.filename,
                error = %source,
                "Migration failed, run aborted"
            );
            return Err(MigrationError::MigrationExecutionError {
                version: migration.version.clone(),
                source,
            });
        }

        Ok(duration_ms)
    }

    /// Compare the migration directory against the registry without applying anything
    pub fn status(&self) -> MigrationResult<MigrationStatusReport> {
        let migration_files = self.scanner.discover_migrations()?;
        let applied = self.get_applied_migrations()?;

        let mut pending = Vec::new();
        let mut drifted = Vec::new();
        for migration in &migration_files {
            match applied.get(&migration.version) {
                Some(recorded) if *recorded != migration.checksum => {
                    drifted.push(migration.version.clone())
                }
                Some(_) => {}
                None => pending.push(migration.clone()),
            }
        }

        Ok(MigrationStatusReport {
            current_version: applied.keys().next_back().cloned(),
            total_migrations: migration_files.len(),
            applied_count: applied.len(),
            pending,
            drifted,
        })
    }
}

/// Status report for migrations
#[derive(Debug)]
pub struct MigrationStatusReport {
    /// Highest applied version
    pub current_version: Option<VersionId>,
    pub total_migrations: usize,
    pub applied_count: usize,
    pub pending: Vec<MigrationFile>,
    /// Applied versions whose files no longer match the recorded checksum
    pub drifted: Vec<VersionId>,
}

/// Report from a migration run
#[derive(Debug)]
pub struct MigrationRunReport {
    pub applied: Vec<AppliedMigration>,
}

/// Successfully applied migration
#[derive(Debug)]
pub struct AppliedMigration {
    pub version: VersionId,
    pub description: String,
    pub duration_ms: u64,
}
