//! # Migration Errors
//!
//! Every failure of a top-level operation (`initialize`, `run_migrations`,
//! `rollback`) surfaces as one of these variants. Registry write and
//! cleanup failures are kept distinct from script failures so the operator
//! knows whether the schema or only the ledger is out of step.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::db::DbError;

use super::version::VersionId;

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Migration error types
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Filename or version identifier does not match `V<number>__<description>.sql`
    #[error("Invalid migration name '{name}': expected V<number>__<description>.sql")]
    InvalidFormat { name: String },

    /// Version generation was handed something other than a `.sql` file
    #[error("Unsupported file type {path:?}: only .sql migrations are supported")]
    UnsupportedFileType { path: PathBuf },

    /// Migration directory does not exist
    #[error("Migration directory not found: {path:?}")]
    DirectoryNotFound { path: PathBuf },

    /// Scanning produced no migration files
    #[error("No migration files found in {path:?}")]
    NoMigrationFilesFound { path: PathBuf },

    /// Every migration on disk is already recorded
    #[error("No migrations to apply")]
    NothingToApply,

    /// An applied migration's file changed after it was applied
    #[error(
        "Applied migration {version} has been changed: registry checksum {expected}, file checksum {actual}"
    )]
    ChecksumDrift {
        version: VersionId,
        expected: String,
        actual: String,
    },

    /// Registry table could not be created
    #[error("Failed to initialize migration registry: {source}")]
    RegistryInitError {
        #[source]
        source: DbError,
    },

    /// Registry row could not be inserted
    #[error("Failed to record migration {version} in registry: {source}")]
    RegistryWriteError {
        version: VersionId,
        #[source]
        source: DbError,
    },

    /// Registry could not be read
    #[error("Failed to read migration registry: {source}")]
    RegistryReadError {
        #[source]
        source: DbError,
    },

    /// A forward migration failed to execute or commit
    #[error("Migration {version} failed: {source}")]
    MigrationExecutionError {
        version: VersionId,
        #[source]
        source: DbError,
    },

    /// A down-script failed to execute or commit
    #[error("Rollback of migration {version} failed: {source}")]
    RollbackExecutionError {
        version: VersionId,
        #[source]
        source: DbError,
    },

    /// Down-scripts ran but the registry could not be pruned.
    ///
    /// The schema is rolled back while the ledger still lists the reversed
    /// versions; reconcile by hand.
    #[error("Rollback succeeded but registry cleanup failed (manual reconciliation required): {source}")]
    RegistryCleanupError {
        #[source]
        source: DbError,
    },

    /// Connection could not be opened
    #[error("Failed to connect to database: {source}")]
    Connection {
        #[source]
        source: DbError,
    },

    /// Migration file could not be read
    #[error("Failed to read migration file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Migration file could not be written
    #[error("Failed to write migration file {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MigrationError {
    /// Stable code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::UnsupportedFileType { .. } => "UNSUPPORTED_FILE_TYPE",
            Self::DirectoryNotFound { .. } => "DIRECTORY_NOT_FOUND",
            Self::NoMigrationFilesFound { .. } => "NO_MIGRATION_FILES_FOUND",
            Self::NothingToApply => "NOTHING_TO_APPLY",
            Self::ChecksumDrift { .. } => "CHECKSUM_DRIFT",
            Self::RegistryInitError { .. } => "REGISTRY_INIT_ERROR",
            Self::RegistryWriteError { .. } => "REGISTRY_WRITE_ERROR",
            Self::RegistryReadError { .. } => "REGISTRY_READ_ERROR",
            Self::MigrationExecutionError { .. } => "MIGRATION_EXECUTION_ERROR",
            Self::RollbackExecutionError { .. } => "ROLLBACK_EXECUTION_ERROR",
            Self::RegistryCleanupError { .. } => "REGISTRY_CLEANUP_ERROR",
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_drift_message() {
        let err = MigrationError::ChecksumDrift {
            version: "V2".parse().unwrap(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("V2"));
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
        assert_eq!(err.code(), "CHECKSUM_DRIFT");
    }

    #[test]
    fn test_cleanup_error_calls_for_reconciliation() {
        let err = MigrationError::RegistryCleanupError {
            source: DbError::Sqlite(rusqlite::Error::InvalidQuery),
        };

        assert!(err.to_string().contains("manual reconciliation"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
