//! # Migration Configuration
//!
//! A migration run is configured by one file (TOML, JSON or YAML, chosen by
//! extension) naming the target database and the migration directories:
//!
//! ```toml
//! migrations_dir = "migrations"
//! applied_by = "deploy-bot"
//!
//! [database]
//! type = "postgresql"
//! host = "localhost"
//! port = 5432
//! user = "app"
//! password = "secret"
//! dbname = "app"
//! ```
//!
//! The `type` field selects the backend. It is consumed by deserialization
//! and never reaches the connector, which only sees the backend parameters.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config_validator::{format_validation_errors, ConfigValidationError, ConfigValidator};

/// Default registry author when none is configured
pub const DEFAULT_APPLIED_BY: &str = "system";

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgresql,
    Mysql,
    Sqlite,
}

impl Backend {
    /// Returns the discriminator used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgresql => "postgresql",
            Backend::Mysql => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }

    fn default_port(&self) -> Option<u16> {
        match self {
            Backend::Postgresql => Some(5432),
            Backend::Mysql => Some(3306),
            Backend::Sqlite => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for a networked database server
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerParams {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    pub user: String,

    #[serde(default)]
    pub password: String,

    pub dbname: String,
}

// Keeps credentials out of logs.
impl fmt::Debug for ServerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Parameters for an embedded SQLite database file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteParams {
    pub path: PathBuf,
}

/// Target database, discriminated by the `type` field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Postgresql(ServerParams),
    Mysql(ServerParams),
    Sqlite(SqliteParams),
}

impl DatabaseConfig {
    /// Backend selected by the discriminator
    pub fn backend(&self) -> Backend {
        match self {
            DatabaseConfig::Postgresql(_) => Backend::Postgresql,
            DatabaseConfig::Mysql(_) => Backend::Mysql,
            DatabaseConfig::Sqlite(_) => Backend::Sqlite,
        }
    }

    /// Port to connect to, falling back to the backend's well-known port
    pub fn port(&self) -> Option<u16> {
        match self {
            DatabaseConfig::Postgresql(p) | DatabaseConfig::Mysql(p) => {
                p.port.or_else(|| self.backend().default_port())
            }
            DatabaseConfig::Sqlite(_) => None,
        }
    }
}

/// Configuration for a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    pub database: DatabaseConfig,

    /// Directory holding forward migrations (`V<version>__<description>.sql`)
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    /// Directory holding down-scripts (defaults to `<migrations_dir>/down`)
    #[serde(default)]
    pub down_dir: Option<PathBuf>,

    /// Recorded in the registry's `applied_by` column
    #[serde(default = "default_applied_by")]
    pub applied_by: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_applied_by() -> String {
    DEFAULT_APPLIED_BY.to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config format for {path:?}: expected .toml, .json, .yaml or .yml")]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration rejected:\n{}", format_validation_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}

impl MigrateConfig {
    /// Create a configuration with default directories
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            database,
            migrations_dir: default_migrations_dir(),
            down_dir: None,
            applied_by: default_applied_by(),
        }
    }

    /// Load configuration from a file; the format follows the extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: MigrateConfig = match ext.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        Ok(config)
    }

    /// Directory holding down-scripts
    pub fn down_dir(&self) -> PathBuf {
        self.down_dir
            .clone()
            .unwrap_or_else(|| self.migrations_dir.join("down"))
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut v = ConfigValidator::new();

        match &self.database {
            DatabaseConfig::Postgresql(p) | DatabaseConfig::Mysql(p) => {
                v.validate_non_empty("database.host", &p.host)
                    .validate_non_empty("database.user", &p.user)
                    .validate_non_empty("database.dbname", &p.dbname);
                if let Some(port) = self.database.port() {
                    v.validate_port("database.port", port);
                }
            }
            DatabaseConfig::Sqlite(p) => {
                v.validate_non_empty("database.path", &p.path.to_string_lossy())
                    .validate_parent_exists("database.path", &p.path);
            }
        }

        v.validate_directory("migrations_dir", &self.migrations_dir)
            .validate_is_directory("down_dir", &self.down_dir())
            .validate_non_empty("applied_by", &self.applied_by);

        v.finish().map_err(ConfigError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml_strips_discriminator() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migrate.toml");
        fs::write(
            &path,
            r#"
migrations_dir = "db/migrations"

[database]
type = "postgresql"
user = "app"
password = "secret"
dbname = "app"
"#,
        )
        .unwrap();

        let config = MigrateConfig::load(&path).unwrap();
        assert_eq!(config.database.backend(), Backend::Postgresql);
        assert_eq!(config.database.port(), Some(5432));
        assert_eq!(config.applied_by, DEFAULT_APPLIED_BY);
        assert_eq!(config.down_dir(), PathBuf::from("db/migrations/down"));

        match config.database {
            DatabaseConfig::Postgresql(params) => {
                assert_eq!(params.host, "localhost");
                assert_eq!(params.dbname, "app");
            }
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn test_load_json_and_yaml() {
        let temp_dir = TempDir::new().unwrap();

        let json = temp_dir.path().join("migrate.json");
        fs::write(
            &json,
            r#"{"database": {"type": "mysql", "user": "root", "dbname": "shop", "port": 3307}}"#,
        )
        .unwrap();
        let config = MigrateConfig::load(&json).unwrap();
        assert_eq!(config.database.backend(), Backend::Mysql);
        assert_eq!(config.database.port(), Some(3307));

        let yaml = temp_dir.path().join("migrate.yaml");
        fs::write(
            &yaml,
            "database:\n  type: sqlite\n  path: ./ledger.db\napplied_by: ci\n",
        )
        .unwrap();
        let config = MigrateConfig::load(&yaml).unwrap();
        assert_eq!(config.database.backend(), Backend::Sqlite);
        assert_eq!(config.applied_by, "ci");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<MigrateConfig, _> =
            serde_json::from_str(r#"{"database": {"type": "oracle", "path": "x"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("migrate.ini");
        fs::write(&path, "type=sqlite").unwrap();

        let err = MigrateConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let config = MigrateConfig {
            database: DatabaseConfig::Postgresql(ServerParams {
                host: "".to_string(),
                port: Some(0),
                user: "".to_string(),
                password: "".to_string(),
                dbname: "app".to_string(),
            }),
            migrations_dir: PathBuf::from("/nonexistent/migrations"),
            down_dir: None,
            applied_by: "system".to_string(),
        };

        match config.validate() {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_password() {
        let params = ServerParams {
            host: "db".to_string(),
            port: None,
            user: "app".to_string(),
            password: "hunter2".to_string(),
            dbname: "app".to_string(),
        };
        let rendered = format!("{:?}", params);
        assert!(!rendered.contains("hunter2"));
    }
}
