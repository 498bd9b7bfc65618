//! In-process flag provider.
//!
//! [`LocalProvider`] evaluates a [`Datafile`] held in memory. It can be seeded
//! from configuration and kept fresh by polling a [`DatafileSource`].
//!
//! ```
//! use flagway_features::FlagProvider;
//! use flagway_features::local::{Datafile, FeatureFlag, LocalProvider};
//! use std::collections::HashMap;
//!
//! let provider = LocalProvider::with_datafile(Datafile::new(vec![
//!     FeatureFlag::boolean("BE_checkout", true).with_variable("limit", 10),
//! ]));
//!
//! assert_eq!(provider.is_feature_enabled("BE_checkout", "all", &HashMap::new()), Ok(true));
//! ```

mod flag;
mod source;

pub use flag::{
    Condition, Datafile, EvaluationContext, FeatureFlag, Operator, Rollout, TargetingRule,
    Variation,
};
pub use source::{DatafileSource, FileSource};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{FlagProvider, Readiness, ReadySignal};
use crate::subject::Attributes;
use chrono::{DateTime, Utc};
use flagway_config::GatewayConfig;
use flagway_log::Logger;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Shortest polling period `spawn_refresh` accepts.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// A failed datafile refresh, reported to the logger.
#[derive(Debug, Clone, Error)]
#[error("Datafile refresh failed for environment {environment}")]
pub struct RefreshFailure {
    pub environment: String,
    #[source]
    pub source: ProviderError,
}

#[derive(Debug, Default)]
struct State {
    datafile: Option<Arc<Datafile>>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Evaluates flags against an in-memory datafile.
///
/// Cloning is cheap and clones share the datafile and readiness.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider {
    state: Arc<RwLock<State>>,
    readiness: Readiness,
}

impl LocalProvider {
    /// An empty provider. It reports `NotReady` until a datafile is loaded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_datafile(datafile: Datafile) -> Self {
        let provider = Self::new();
        provider.load(datafile);
        provider
    }

    /// Seed from `datafile_seed`. Only a seed carrying `features` counts as a
    /// datafile; `{}` leaves the provider waiting for its first refresh.
    pub fn from_config(config: &GatewayConfig) -> ProviderResult<Self> {
        let seed = &config.datafile_seed;
        if seed.get("features").is_none() {
            return Ok(Self::new());
        }

        let datafile = Datafile::from_value(seed.clone())?;
        Ok(Self::with_datafile(datafile))
    }

    /// Swap in a new datafile and mark the provider ready.
    pub fn load(&self, datafile: Datafile) {
        datafile.compile_patterns();
        {
            let mut state = self.state.write();
            state.datafile = Some(Arc::new(datafile));
            state.refreshed_at = Some(Utc::now());
        }
        self.readiness.mark_ready();
    }

    pub fn datafile(&self) -> Option<Arc<Datafile>> {
        self.state.read().datafile.clone()
    }

    pub fn revision(&self) -> Option<String> {
        self.datafile()?.revision.clone()
    }

    /// When the current datafile was loaded.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().refreshed_at
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Fetch once and load the result. The current datafile is kept on error.
    pub async fn refresh(
        &self,
        source: &dyn DatafileSource,
        environment_key: &str,
    ) -> ProviderResult<()> {
        let datafile = source.fetch(environment_key).await?;
        flagway_log::debug!(
            target: "flagway::local",
            "Loaded datafile for {} (revision {})",
            environment_key,
            datafile.revision.as_deref().unwrap_or("-")
        );
        self.load(datafile);
        Ok(())
    }

    /// Poll `source` every `every` (at least [`MIN_REFRESH_INTERVAL`]),
    /// starting immediately. Failures are logged and retried on the next tick.
    pub fn spawn_refresh(
        &self,
        source: Arc<dyn DatafileSource>,
        environment_key: impl Into<String>,
        every: Duration,
        logger: Arc<dyn Logger>,
    ) -> JoinHandle<()> {
        let provider = self.clone();
        let environment = environment_key.into();
        let every = every.max(MIN_REFRESH_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(err) = provider.refresh(source.as_ref(), &environment).await {
                    logger.error(&RefreshFailure {
                        environment: environment.clone(),
                        source: err,
                    });
                }
            }
        })
    }

    fn with_flag<T>(
        &self,
        key: &str,
        evaluate: impl FnOnce(&FeatureFlag) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let datafile = self.datafile().ok_or(ProviderError::NotReady)?;
        let flag = datafile
            .feature(key)
            .ok_or_else(|| ProviderError::UnknownFeature(key.to_string()))?;
        evaluate(flag)
    }
}

impl FlagProvider for LocalProvider {
    fn ready(&self) -> ReadySignal {
        self.readiness.signal()
    }

    fn is_feature_enabled(
        &self,
        key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<bool> {
        self.with_flag(key, |flag| {
            let context = EvaluationContext::for_subject(user_id, attributes);
            flag.evaluate(&context)
                .as_bool()
                .ok_or_else(|| ProviderError::TypeMismatch {
                    feature: key.to_string(),
                    expected: "boolean",
                })
        })
    }

    fn feature_variable(
        &self,
        key: &str,
        variable: &str,
        _user_id: &str,
        _attributes: &Attributes,
    ) -> ProviderResult<Option<Value>> {
        self.with_flag(key, |flag| {
            flag.variable(variable)
                .cloned()
                .map(Some)
                .ok_or_else(|| ProviderError::UnknownVariable {
                    feature: key.to_string(),
                    variable: variable.to_string(),
                })
        })
    }

    fn enabled_features(&self, user_id: &str, attributes: &Attributes) -> ProviderResult<Vec<String>> {
        let datafile = self.datafile().ok_or(ProviderError::NotReady)?;
        let context = EvaluationContext::for_subject(user_id, attributes);

        let mut keys: Vec<String> = datafile
            .features
            .iter()
            .filter(|flag| flag.evaluate(&context).as_bool() == Some(true))
            .map(|flag| flag.key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
