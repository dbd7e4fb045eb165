//! CLI argument definitions using clap
//!
//! Commands:
//! - schema-ledger --config <path> init
//! - schema-ledger --config <path> up
//! - schema-ledger --config <path> down --target <version>
//! - schema-ledger --config <path> status
//! - schema-ledger --config <path> new --file <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// schema-ledger - versioned SQL migrations with a checksummed ledger
#[derive(Parser, Debug)]
#[command(name = "schema-ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (.toml, .json, .yaml)
    #[arg(long, global = true, default_value = "./migrate.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create the migration registry table
    Init,

    /// Apply all pending migrations
    Up,

    /// Roll back every migration newer than the target
    Down {
        /// Version to keep, as `V2`, `2` or a migration filename
        #[arg(long)]
        target: String,
    },

    /// Show applied, pending and modified migrations
    Status,

    /// Add an authored SQL file as a new versioned migration
    New {
        /// SQL file to copy into the migrations directory
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_down_with_target() {
        let cli = Cli::try_parse_from(["schema-ledger", "--config", "db.yaml", "down", "--target", "V2"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("db.yaml"));
        assert_eq!(
            cli.command,
            Command::Down {
                target: "V2".to_string()
            }
        );
    }

    #[test]
    fn test_parse_default_config() {
        let cli = Cli::try_parse_from(["schema-ledger", "up"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("./migrate.toml"));
        assert_eq!(cli.command, Command::Up);
    }

    #[test]
    fn test_config_after_subcommand() {
        let cli = Cli::try_parse_from(["schema-ledger", "status", "--config", "m.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("m.json"));
    }

    #[test]
    fn test_down_requires_target() {
        assert!(Cli::try_parse_from(["schema-ledger", "down"]).is_err());
    }
}
