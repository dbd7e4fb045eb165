//! PostgreSQL registry SQL.

use super::{Adapter, SqlTemplates};
use crate::config::Backend;

const TEMPLATES: SqlTemplates = SqlTemplates {
    create_registry: "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            id SERIAL PRIMARY KEY,
            version VARCHAR(50) NOT NULL,
            description VARCHAR(200),
            filename VARCHAR(255) NOT NULL,
            checksum VARCHAR(64) NOT NULL,
            executed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            execution_time BIGINT,
            status VARCHAR(20) NOT NULL,
            applied_by VARCHAR(100) DEFAULT 'system',
            UNIQUE (version)
        );",
    record_migration: "
        INSERT INTO schema_migrations
            (version, description, filename, checksum, execution_time, status, applied_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)",
    applied_migrations: "SELECT version, checksum FROM schema_migrations ORDER BY version",
    delete_versions: "DELETE FROM schema_migrations WHERE version IN",
};

/// PostgreSQL: serial key, `$n` placeholders, `executed_at` from the column default
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresAdapter;

impl Adapter for PostgresAdapter {
    fn backend(&self) -> Backend {
        Backend::Postgresql
    }

    fn templates(&self) -> &SqlTemplates {
        &TEMPLATES
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let adapter = PostgresAdapter;
        assert!(adapter.templates().create_registry.contains("SERIAL PRIMARY KEY"));
        assert!(adapter.templates().record_migration.contains("$7"));
        assert!(!adapter.templates().record_migration.contains("NOW()"));
        assert_eq!(adapter.placeholder(3), "$3");
    }
}
