//! The gateway's static configuration.

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigLoader, ConfigManager, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment key meaning "never consult the remote provider".
pub const NO_REMOTE_ENVIRONMENT: &str = "none";

/// Prefix applied to flag names when none is configured.
pub const DEFAULT_NAME_PREFIX: &str = "BE_";

/// Five minutes.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 300_000;

/// Immutable gateway settings, created once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Remote environment to query, or `"none"`.
    #[serde(default = "default_environment_key")]
    pub environment_key: Option<String>,

    /// Prepended to every flag name. Unset or empty means `"BE_"`.
    #[serde(default)]
    pub name_prefix: Option<String>,

    /// Values served when the provider is off or failing.
    #[serde(default, deserialize_with = "lenient::defaults")]
    pub static_defaults: HashMap<String, Option<bool>>,

    /// Provider bootstrap payload.
    #[serde(default = "empty_object", deserialize_with = "lenient::object")]
    pub datafile_seed: Value,

    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "lenient::millis"
    )]
    pub refresh_interval_ms: u64,
}

fn default_environment_key() -> Option<String> {
    Some(NO_REMOTE_ENVIRONMENT.to_string())
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment_key: default_environment_key(),
            name_prefix: None,
            static_defaults: HashMap::new(),
            datafile_seed: empty_object(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Load from `.env`, then `FLAGWAY_*` variables.
    pub fn from_env() -> Result<Self> {
        let manager = ConfigManager::gateway();
        manager.load_dotenv(None)?;
        manager.load_validated()
    }

    /// Load from a JSON, TOML or env file chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let manager = ConfigManager::gateway();
        manager.load_file(&path, ConfigLoader::auto(&path)?.format())?;
        manager.load_validated()
    }

    /// The configured environment, if any. Empty strings count as unset.
    pub fn environment_key(&self) -> Option<&str> {
        self.environment_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn name_prefix(&self) -> &str {
        self.name_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_NAME_PREFIX)
    }

    /// Static default for a flag. Missing and `null` both yield `None`.
    pub fn static_default(&self, flag: &str) -> Option<bool> {
        self.static_defaults.get(flag).copied().flatten()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.refresh_interval_ms, "refresh_interval_ms")?;
        if let Some(prefix) = self.name_prefix.as_deref() {
            ConfigValidator::no_whitespace(prefix, "name_prefix")?;
        }
        if let Some(key) = self.environment_key() {
            ConfigValidator::no_whitespace(key, "environment_key")?;
        }
        ConfigValidator::is_object(&self.datafile_seed, "datafile_seed")
    }
}

/// Programmatic construction; `build` validates.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn environment_key(mut self, key: impl Into<String>) -> Self {
        self.config.environment_key = Some(key.into());
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.name_prefix = Some(prefix.into());
        self
    }

    pub fn static_default(mut self, flag: impl Into<String>, value: impl Into<Option<bool>>) -> Self {
        self.config.static_defaults.insert(flag.into(), value.into());
        self
    }

    pub fn datafile_seed(mut self, seed: Value) -> Self {
        self.config.datafile_seed = seed;
        self
    }

    pub fn refresh_interval_ms(mut self, millis: u64) -> Self {
        self.config.refresh_interval_ms = millis;
        self
    }

    pub fn build(self) -> Result<GatewayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Deserializers that also accept the string forms produced by environment
/// variables and env files.
mod lenient {
    use super::*;
    use serde::de::Error;

    fn embedded_json<'de, D: Deserializer<'de>>(value: Value) -> std::result::Result<Value, D::Error> {
        match value {
            Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
            Value::String(text) => serde_json::from_str(&text).map_err(D::Error::custom),
            other => Ok(other),
        }
    }

    pub fn defaults<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, Option<bool>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match embedded_json::<D>(Value::deserialize(deserializer)?)? {
            Value::Null => Ok(HashMap::new()),
            value => serde_json::from_value(value).map_err(D::Error::custom),
        }
    }

    pub fn object<'de, D>(deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        match embedded_json::<D>(Value::deserialize(deserializer)?)? {
            Value::Null => Ok(empty_object()),
            value => Ok(value),
        }
    }

    pub fn millis<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| D::Error::custom(format!("{} is not a whole number of milliseconds", n))),
            Value::String(text) => text.trim().parse().map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("expected milliseconds, got {}", other))),
        }
    }
}
