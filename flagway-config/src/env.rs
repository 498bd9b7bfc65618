// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix used for gateway settings, e.g. `FLAGWAY_ENVIRONMENT_KEY`.
pub const DEFAULT_ENV_PREFIX: &str = "FLAGWAY";

/// Reads prefixed environment variables into lower-case config keys.
///
/// `FLAGWAY_NAME_PREFIX=Z-` becomes `name_prefix = "Z-"`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `FLAGWAY_` namespace.
    pub fn gateway() -> Self {
        Self::new(Some(DEFAULT_ENV_PREFIX.to_string()))
    }

    /// Collect every matching variable.
    pub fn load(&self) -> HashMap<String, String> {
        env::vars()
            .filter_map(|(key, value)| self.config_key(&key).map(|k| (k, value)))
            .collect()
    }

    fn config_key(&self, var: &str) -> Option<String> {
        match self.prefix {
            Some(ref prefix) => var
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(str::to_lowercase),
            None => Some(var.to_lowercase()),
        }
    }

    /// Load a single variable by its config key.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let name = self.var_name(key);
        env::var(&name).map_err(|source| ConfigError::Env { name, source })
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Environment variable name for a config key.
    pub fn var_name(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::gateway()
    }
}
