//! # Migration Generator
//!
//! Adds an authored SQL file to the migrations directory under a fresh
//! timestamp version, so new migrations always sort after existing ones.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::errors::{MigrationError, MigrationResult};
use super::version::VersionManager;

/// Migration generator
pub struct MigrationGenerator {
    migrations_dir: PathBuf,
    version_manager: VersionManager,
}

impl MigrationGenerator {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            version_manager: VersionManager::new(),
        }
    }

    /// Copy `source` into the migrations directory as `V<timestamp>__<name>`.
    ///
    /// Returns the path of the new migration file.
    pub fn create(&self, source: &Path) -> MigrationResult<PathBuf> {
        let filename = self.version_manager.generate_file_version(source)?;

        let content = fs::read(source).map_err(|e| MigrationError::FileRead {
            path: source.to_path_buf(),
            source: e,
        })?;

        if !self.migrations_dir.exists() {
            fs::create_dir_all(&self.migrations_dir).map_err(|e| MigrationError::FileWrite {
                path: self.migrations_dir.clone(),
                source: e,
            })?;
        }

        let file_path = self.migrations_dir.join(&filename);
        fs::write(&file_path, &content).map_err(|e| MigrationError::FileWrite {
            path: file_path.clone(),
            source: e,
        })?;

        info!(file = %filename, "Created migration");
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::scanner::MigrationScanner;
    use tempfile::TempDir;

    #[test]
    fn test_create_copies_versioned_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("add_users.sql");
        fs::write(&source, "CREATE TABLE users (id INT);").unwrap();

        let migrations_dir = temp_dir.path().join("migrations");
        let created = MigrationGenerator::new(&migrations_dir)
            .create(&source)
            .unwrap();

        assert!(migrations_dir.is_dir());
        assert_eq!(
            fs::read_to_string(&created).unwrap(),
            "CREATE TABLE users (id INT);"
        );

        let name = created.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with('V'));
        assert!(name.ends_with("__add_users.sql"));

        let found = MigrationScanner::new(&migrations_dir)
            .discover_migrations()
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, created);
    }

    #[test]
    fn test_create_rejects_non_sql() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("notes.txt");
        fs::write(&source, "hello").unwrap();

        let migrations_dir = temp_dir.path().join("migrations");
        let err = MigrationGenerator::new(&migrations_dir)
            .create(&source)
            .unwrap_err();

        assert!(matches!(err, MigrationError::UnsupportedFileType { .. }));
        assert!(!migrations_dir.exists());
    }

    #[test]
    fn test_create_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let err = MigrationGenerator::new(temp_dir.path())
            .create(&temp_dir.path().join("missing.sql"))
            .unwrap_err();
        assert!(matches!(err, MigrationError::FileRead { .. }));
    }
}
