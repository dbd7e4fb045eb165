//! # Migration Scanner
//!
//! Discovers `V<version>__<description>.sql` files in one directory, reads
//! them fully and checksums them. Results come back in ascending version
//! order and callers rely on that order as-is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::checksum::compute_checksum;
use super::errors::{MigrationError, MigrationResult};
use super::version::VersionManager;
use super::MigrationFile;

/// Scans a directory for migration files
#[derive(Debug, Clone)]
pub struct MigrationScanner {
    migration_dir: PathBuf,
    version_manager: VersionManager,
}

impl MigrationScanner {
    pub fn new(migration_dir: impl Into<PathBuf>) -> Self {
        Self {
            migration_dir: migration_dir.into(),
            version_manager: VersionManager::new(),
        }
    }

    pub fn migration_dir(&self) -> &Path {
        &self.migration_dir
    }

    /// Discover migration files, sorted ascending by version.
    ///
    /// Files that do not match the naming pattern are skipped. An empty
    /// result is not an error here.
    pub fn discover_migrations(&self) -> MigrationResult<Vec<MigrationFile>> {
        if !self.migration_dir.is_dir() {
            return Err(MigrationError::DirectoryNotFound {
                path: self.migration_dir.clone(),
            });
        }

        let read_err = |e| MigrationError::FileRead {
            path: self.migration_dir.clone(),
            source: e,
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.migration_dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if self.version_manager.is_migration_name(name)
                    && self.version_manager.extract_version(name).is_err()
                {
                    warn!(file = %name, "Skipping migration with unusable version number");
                }
            }
            candidates.push(path);
        }

        let mut migrations = Vec::new();
        for path in self.version_manager.order_migrations(candidates) {
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let (version, description) = match self.version_manager.parse_filename(&filename) {
                Ok(parsed) => parsed,
                Err(_) => continue,
            };

            let content = fs::read(&path).map_err(|e| MigrationError::FileRead {
                path: path.clone(),
                source: e,
            })?;

            migrations.push(MigrationFile {
                version,
                description: description.replace('_', ""),
                filename,
                checksum: compute_checksum(&content),
                path,
            });
        }

        debug!(
            dir = %self.migration_dir.display(),
            count = migrations.len(),
            "Discovered migrations"
        );

        Ok(migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_discover_orders_by_numeric_version() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "V1__init.sql", "CREATE TABLE a (id INT);");
        write(temp_dir.path(), "V2__add_users.sql", "CREATE TABLE users (id INT);");
        write(temp_dir.path(), "V1.5__patch.sql", "CREATE TABLE b (id INT);");

        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();

        let versions: Vec<String> = migrations.iter().map(|m| m.version.to_string()).collect();
        assert_eq!(versions, ["V1", "V1.5", "V2"]);
    }

    #[test]
    fn test_discover_lexical_trap() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "V10__later.sql", "SELECT 10;");
        write(temp_dir.path(), "V9__earlier.sql", "SELECT 9;");

        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();
        assert_eq!(migrations[0].filename, "V9__earlier.sql");
        assert_eq!(migrations[1].filename, "V10__later.sql");
    }

    #[test]
    fn test_discover_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let content = "CREATE TABLE users (id INT);";
        write(temp_dir.path(), "V2__add_users.sql", content);

        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();
        let m = &migrations[0];

        assert_eq!(m.description, "addusers");
        assert_eq!(m.filename, "V2__add_users.sql");
        assert_eq!(m.path, temp_dir.path().join("V2__add_users.sql"));
        assert_eq!(m.checksum, compute_checksum(content.as_bytes()));
    }

    #[test]
    fn test_discover_skips_non_matching() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "README.md", "docs");
        write(temp_dir.path(), "V1_missing_separator.sql", "SELECT 1;");
        write(temp_dir.path(), "seed.sql", "SELECT 1;");
        fs::create_dir(temp_dir.path().join("V3__directory.sql")).unwrap();
        write(temp_dir.path(), "V1__init.sql", "SELECT 1;");

        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].filename, "V1__init.sql");
    }

    #[test]
    fn test_discover_skips_oversized_version() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "V123456789012345678901234__huge.sql", "SELECT 1;");
        write(temp_dir.path(), "V1__init.sql", "SELECT 1;");

        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].filename, "V1__init.sql");
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = MigrationScanner::new(temp_dir.path())
            .discover_migrations()
            .unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_discover_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = MigrationScanner::new(temp_dir.path().join("nope")).discover_migrations();
        assert!(matches!(result, Err(MigrationError::DirectoryNotFound { .. })));
    }
}
