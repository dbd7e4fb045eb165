//! # Migration Registry
//!
//! Owns the `schema_migrations` ledger. Every operation is a self-contained
//! unit of work: open a connection, run one transaction, commit or roll
//! back, close. Nothing about the ledger is cached between calls, so two
//! runner invocations never see stale state from each other.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::adapters::{adapter_for, Adapter};
use super::errors::{MigrationError, MigrationResult};
use super::version::VersionId;
use super::MigrationFile;
use crate::config::{DatabaseConfig, MigrateConfig, DEFAULT_APPLIED_BY};
use crate::db::{self, transactional, Connection, DbResult};

/// Applied-migration ledger for one database
pub struct MigrationRegistry {
    db_config: DatabaseConfig,
    adapter: Box<dyn Adapter>,
    applied_by: String,
}

impl MigrationRegistry {
    /// Create a registry; the adapter is chosen by the config's backend
    pub fn new(db_config: DatabaseConfig) -> Self {
        let adapter = adapter_for(db_config.backend());
        Self {
            db_config,
            adapter,
            applied_by: DEFAULT_APPLIED_BY.to_string(),
        }
    }

    /// Create a registry from a full migration config
    pub fn from_config(config: &MigrateConfig) -> Self {
        Self::new(config.database.clone()).with_applied_by(config.applied_by.clone())
    }

    /// Set the default `applied_by` value for recorded migrations
    pub fn with_applied_by(mut self, applied_by: impl Into<String>) -> Self {
        self.applied_by = applied_by.into();
        self
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    pub fn applied_by(&self) -> &str {
        &self.applied_by
    }

    /// Open a new, unpooled connection to the target database
    pub fn get_connection(&self) -> MigrationResult<Box<dyn Connection>> {
        self.connect()
            .map_err(|source| MigrationError::Connection { source })
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        debug!(backend = %self.db_config.backend(), "Opening database connection");
        db::connect(&self.db_config)
    }

    /// Create the registry table if it does not already exist
    pub fn initialize(&self) -> MigrationResult<()> {
        let result = self.connect().and_then(|mut conn| {
            transactional(conn.as_mut(), |c| self.adapter.initialize_registry(c))
        });

        if let Err(source) = result {
            warn!(error = %source, "Registry initialization failed");
            return Err(MigrationError::RegistryInitError { source });
        }

        info!(backend = %self.db_config.backend(), "Migration registry initialized");
        Ok(())
    }

    /// Record a migration with the registry's default `applied_by`
    pub fn record_migration(
        &self,
        migration: &MigrationFile,
        execution_time_ms: i64,
        status: &str,
    ) -> MigrationResult<()> {
        self.record_migration_as(migration, execution_time_ms, status, &self.applied_by)
    }

    /// Insert one ledger row in its own transaction
    pub fn record_migration_as(
        &self,
        migration: &MigrationFile,
        execution_time_ms: i64,
        status: &str,
        applied_by: &str,
    ) -> MigrationResult<()> {
        let result = self.connect().and_then(|mut conn| {
            transactional(conn.as_mut(), |c| {
                self.adapter
                    .record_migration(c, migration, execution_time_ms, status, applied_by)
            })
        });

        result.map_err(|source| MigrationError::RegistryWriteError {
            version: migration.version.clone(),
            source,
        })?;

        debug!(version = %migration.version, status, "Recorded migration");
        Ok(())
    }

    /// Map of applied version to recorded checksum, in version order
    pub fn get_applied_migrations(&self) -> MigrationResult<BTreeMap<VersionId, String>> {
        let rows = self
            .connect()
            .and_then(|mut conn| {
                transactional(conn.as_mut(), |c| self.adapter.get_applied_migrations(c))
            })
            .map_err(|source| MigrationError::RegistryReadError { source })?;

        let mut applied = BTreeMap::new();
        for (version, checksum) in rows {
            applied.insert(version.parse::<VersionId>()?, checksum);
        }
        Ok(applied)
    }

    /// Delete every ledger row whose version is greater than `target`.
    ///
    /// Versions compare numerically, so the candidates are selected here and
    /// removed with one statement, committed once. Returns the number of rows
    /// deleted.
    pub fn remove_migrations_after(&self, target: &VersionId) -> MigrationResult<usize> {
        let result = self.connect().and_then(|mut conn| {
            transactional(conn.as_mut(), |c| {
                let doomed: Vec<String> = self
                    .adapter
                    .get_applied_migrations(c)?
                    .into_iter()
                    .filter_map(|(version, _)| match version.parse::<VersionId>() {
                        Ok(parsed) if &parsed > target => Some(version),
                        Ok(_) => None,
                        Err(_) => {
                            warn!(version = %version, "Skipping unparseable registry version");
                            None
                        }
                    })
                    .collect();
                self.adapter.remove_migrations(c, &doomed)
            })
        });

        let removed = result.map_err(|source| MigrationError::RegistryCleanupError { source })?;
        info!(after = %target, removed, "Pruned migration registry");
        Ok(removed as usize)
    }
}
