//! Command-line interface for schema-ledger

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::write_error;
