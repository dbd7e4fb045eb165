//! schema-ledger - versioned SQL schema migrations
//!
//! Discovers `V<version>__<description>.sql` files, applies them in
//! numeric version order against PostgreSQL, MySQL or SQLite, records each
//! applied migration with its checksum in a `schema_migrations` table, and
//! rolls back to an earlier version with matching down-scripts.

pub mod cli;
pub mod config;
pub mod config_validator;
pub mod db;
pub mod migrations;
