//! Configuration for the Flagway gateway.
//!
//! Settings are gathered into a [`ConfigManager`] from any mix of
//! environment variables, `.env` files and JSON / TOML files, then
//! deserialized and validated into an immutable [`GatewayConfig`].
//!
//! ```no_run
//! use flagway_config::{ConfigManager, FileFormat, GatewayConfig};
//!
//! let manager = ConfigManager::gateway();
//! manager.load_file("flags.toml", FileFormat::Toml)?;
//! manager.load_env();
//! let config: GatewayConfig = manager.load_validated()?;
//! # Ok::<(), flagway_config::ConfigError>(())
//! ```

pub mod env;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod validation;

pub use env::{DEFAULT_ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use gateway::{
    DEFAULT_NAME_PREFIX, DEFAULT_REFRESH_INTERVAL_MS, GatewayConfig, GatewayConfigBuilder,
    NO_REMOTE_ENVIRONMENT,
};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Layered key/value store; later loads override earlier ones.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Manager reading `FLAGWAY_*` variables.
    pub fn gateway() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Merge environment variables into the store.
    pub fn load_env(&self) {
        let env_vars = EnvLoader::new(self.env_prefix.clone()).load();

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }
    }

    /// Export a `.env` file into the process environment, then load it.
    ///
    /// Without a path a missing `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path)?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env();
        Ok(())
    }

    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            self.config.write().extend(map);
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|source| ConfigError::Serialize {
            key: key.to_string(),
            source,
        })?;

        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .config
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(ConfigError::Deserialize)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Copy every key from `other`, overriding existing ones.
    pub fn merge(&self, other: &ConfigManager) {
        let snapshot = other.config.read().clone();
        self.config.write().extend(snapshot);
    }

    /// Deserialize the whole store into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let snapshot = Value::Object(self.config.read().clone());
        let validated: T = serde_json::from_value(snapshot).map_err(ConfigError::Deserialize)?;
        validated.validate()?;
        Ok(validated)
    }
}
