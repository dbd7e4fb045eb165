//! MySQL registry SQL.

use super::{Adapter, SqlTemplates};
use crate::config::Backend;

const TEMPLATES: SqlTemplates = SqlTemplates {
    create_registry: "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            id INT AUTO_INCREMENT PRIMARY KEY,
            version VARCHAR(50) NOT NULL,
            description VARCHAR(200),
            filename VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            executed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            execution_time BIGINT,
            status VARCHAR(20) NOT NULL,
            applied_by VARCHAR(100) DEFAULT 'system',
            UNIQUE KEY (version)
        )",
    record_migration: "
        INSERT INTO schema_migrations
            (version, description, filename, checksum, executed_at, execution_time, status, applied_by)
        VALUES (?, ?, ?, ?, NOW(), ?, ?, ?)",
    applied_migrations: "SELECT version, checksum FROM schema_migrations ORDER BY version",
    delete_versions: "DELETE FROM schema_migrations WHERE version IN",
};

/// MySQL: auto-increment key, `?` placeholders, `executed_at = NOW()`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlAdapter;

impl Adapter for MySqlAdapter {
    fn backend(&self) -> Backend {
        Backend::Mysql
    }

    fn templates(&self) -> &SqlTemplates {
        &TEMPLATES
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }
}
