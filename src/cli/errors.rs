//! CLI errors
//!
//! Every failure surfaces as a JSON error object with a stable code.

use thiserror::Error;

use crate::config::ConfigError;
use crate::migrations::MigrationError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    /// Stable error code for JSON output
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Migration(e) => e.code(),
            Self::Output(_) | Self::Encode(_) => "OUTPUT_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_code_passes_through() {
        let err = CliError::from(MigrationError::NothingToApply);
        assert_eq!(err.code(), "NOTHING_TO_APPLY");
    }
}
