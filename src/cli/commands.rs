//! CLI command implementations
//!
//! Each command loads the configuration, runs one migration operation and
//! prints a single JSON document. Errors are printed by the binary.

use std::path::Path;

use serde_json::{json, Value};

use crate::config::MigrateConfig;
use crate::migrations::adapters::REGISTRY_TABLE;
use crate::migrations::generator::MigrationGenerator;
use crate::migrations::{
    MigrationError, MigrationRegistry, MigrationRollback, MigrationRunner, VersionManager,
};

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(&cli.config, cli.command)
}

/// Load the configuration, run `cmd` and print its response
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<()> {
    let config = MigrateConfig::load(config_path)?;
    let response = execute(&config, cmd)?;
    write_response(response)
}

/// Run `cmd` against an already loaded configuration
pub fn execute(config: &MigrateConfig, cmd: Command) -> CliResult<Value> {
    // `new` may create the migrations directory, everything else needs it
    if !matches!(cmd, Command::New { .. }) {
        config.validate()?;
    }

    match cmd {
        Command::Init => init(config),
        Command::Up => up(config),
        Command::Down { target } => down(config, &target),
        Command::Status => status(config),
        Command::New { file } => new_migration(config, &file),
    }
}

/// Create the registry table
pub fn init(config: &MigrateConfig) -> CliResult<Value> {
    MigrationRegistry::from_config(config).initialize()?;

    Ok(json!({
        "initialized": true,
        "backend": config.database.backend().as_str(),
        "table": REGISTRY_TABLE,
    }))
}

/// Apply pending migrations
pub fn up(config: &MigrateConfig) -> CliResult<Value> {
    let runner = MigrationRunner::from_config(config);

    let report = match runner.run_migrations() {
        Ok(report) => report,
        Err(MigrationError::NothingToApply) => {
            return Ok(json!({
                "success": true,
                "applied_count": 0,
                "applied": [],
                "message": "No pending migrations",
            }))
        }
        Err(e) => return Err(e.into()),
    };

    let applied: Vec<Value> = report
        .applied
        .iter()
        .map(|m| {
            json!({
                "version": m.version.to_string(),
                "description": m.description,
                "duration_ms": m.duration_ms,
            })
        })
        .collect();

    Ok(json!({
        "success": true,
        "applied_count": applied.len(),
        "applied": applied,
    }))
}

/// Roll back to `target`
pub fn down(config: &MigrateConfig, target: &str) -> CliResult<Value> {
    let mut rollback = MigrationRollback::from_config(config);
    let report = rollback.rollback(target)?;

    let reversed: Vec<String> = report.reversed.iter().map(ToString::to_string).collect();

    Ok(json!({
        "success": true,
        "target": report.target.to_string(),
        "rolled_back": reversed,
        "removed_from_registry": report.removed_from_registry,
    }))
}

/// Report migration status
pub fn status(config: &MigrateConfig) -> CliResult<Value> {
    let status = MigrationRunner::from_config(config).status()?;

    let pending: Vec<Value> = status
        .pending
        .iter()
        .map(|m| {
            json!({
                "version": m.version.to_string(),
                "description": m.description,
                "file": m.filename,
            })
        })
        .collect();
    let drifted: Vec<String> = status.drifted.iter().map(ToString::to_string).collect();

    Ok(json!({
        "current_version": status.current_version.map(|v| v.to_string()),
        "total_migrations": status.total_migrations,
        "applied_count": status.applied_count,
        "pending_count": pending.len(),
        "pending": pending,
        "modified": drifted,
    }))
}

/// Add `file` to the migrations directory under a new version
pub fn new_migration(config: &MigrateConfig, file: &Path) -> CliResult<Value> {
    let path = MigrationGenerator::new(config.migrations_dir.clone()).create(file)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let version = VersionManager::new().extract_version(&filename)?;

    Ok(json!({
        "created": true,
        "version": version.to_string(),
        "file": path.to_string_lossy(),
    }))
}
