// Configuration validation

use crate::{ConfigError, Result};
use serde_json::Value;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ConfigError::invalid(field, "cannot be empty"));
        }
        Ok(())
    }

    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::invalid(field, "must be greater than zero"));
        }
        Ok(())
    }

    /// Provider keys are built by plain concatenation; no trimming happens.
    pub fn no_whitespace(value: &str, field: &str) -> Result<()> {
        if value.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(field, "must not contain whitespace"));
        }
        Ok(())
    }

    pub fn is_object(value: &Value, field: &str) -> Result<()> {
        if !value.is_object() {
            return Err(ConfigError::invalid(field, "must be a JSON object"));
        }
        Ok(())
    }
}
