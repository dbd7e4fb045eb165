//! Configuration Validation
//!
//! Validates a loaded migration configuration before any connection is
//! opened. Every problem is collected so the operator sees them all at once.

use std::path::Path;

/// A single rejected configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid configuration for '{}': {} (value: {})",
            self.field, self.message, self.value
        )
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of config validation
pub type ConfigResult<T> = Result<T, Vec<ConfigValidationError>>;

/// Configuration validator
pub struct ConfigValidator {
    errors: Vec<ConfigValidationError>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn error(&mut self, field: &str, value: impl std::fmt::Display, message: &str) {
        self.errors.push(ConfigValidationError {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        });
    }

    /// Validate port number (1-65535)
    pub fn validate_port(&mut self, field: &str, port: u16) -> &mut Self {
        if port == 0 {
            self.error(field, port, "Port must be between 1 and 65535");
        }
        self
    }

    /// Validate non-empty string
    pub fn validate_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.error(field, value, "Value cannot be empty");
        }
        self
    }

    /// Validate path exists and is a directory
    pub fn validate_directory(&mut self, field: &str, path: &Path) -> &mut Self {
        if !path.exists() {
            self.error(field, path.display(), "Path does not exist");
        } else if !path.is_dir() {
            self.error(field, path.display(), "Path is not a directory");
        }
        self
    }

    /// Validate that an optional directory, when it exists, is a directory
    pub fn validate_is_directory(&mut self, field: &str, path: &Path) -> &mut Self {
        if path.exists() && !path.is_dir() {
            self.error(field, path.display(), "Path is not a directory");
        }
        self
    }

    /// Validate that the parent of a file path exists
    pub fn validate_parent_exists(&mut self, field: &str, path: &Path) -> &mut Self {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            if !parent.exists() {
                self.error(field, path.display(), "Parent directory does not exist");
            }
        }
        self
    }

    /// Finish validation and return result
    pub fn finish(self) -> ConfigResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Check if any errors occurred
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Format validation errors for display
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
