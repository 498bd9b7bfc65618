//! The Flag Gateway.

use crate::error::ProviderError;
use crate::fallback::{Evaluation, Fallback};
use crate::mode::GatewayMode;
use crate::naming::namespace;
use crate::provider::FlagProvider;
use crate::subject::{Subject, attributes_of, identify};
use flagway_config::GatewayConfig;
use flagway_log::Logger;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Scope the gateway's logger is tagged with.
pub const LOG_SCOPE: &str = "feature flags";

/// Public gateway operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    HasFeature,
    GetFeatureVariable,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::HasFeature => "hasFeature",
            Operation::GetFeatureVariable => "getFeatureVariable",
        })
    }
}

/// A provider failure as reported to the logger.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed for {key}")]
pub struct EvaluationFailure {
    pub operation: Operation,
    pub key: String,
    #[source]
    pub source: ProviderError,
}

/// Queries feature flags by business name.
///
/// Every provider failure is logged and replaced by a static default; callers
/// always get a value back.
///
/// ```
/// use flagway_config::GatewayConfig;
/// use flagway_features::{FlagGateway, LocalProvider};
/// use flagway_log::NoopLogger;
/// use std::sync::Arc;
///
/// let config = GatewayConfig::builder().static_default("checkout", true).build()?;
/// let provider = LocalProvider::from_config(&config)?;
/// let gateway = FlagGateway::new(config, Arc::new(provider), Arc::new(NoopLogger));
///
/// // environment_key defaults to "none": static defaults only
/// assert_eq!(gateway.has_feature("checkout", None), Some(true));
/// assert_eq!(gateway.get_feature_variable("checkout", "limit", None), None);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct FlagGateway {
    config: Arc<GatewayConfig>,
    mode: GatewayMode,
    provider: Arc<dyn FlagProvider>,
    logger: Arc<dyn Logger>,
}

impl FlagGateway {
    pub fn new(
        config: impl Into<Arc<GatewayConfig>>,
        provider: Arc<dyn FlagProvider>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let config = config.into();
        logger.set_scope(LOG_SCOPE);

        Self {
            mode: GatewayMode::resolve(&config),
            config,
            provider,
            logger,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn mode(&self) -> GatewayMode {
        self.mode
    }

    pub fn provider(&self) -> &Arc<dyn FlagProvider> {
        &self.provider
    }

    /// Whether `flag_name` is enabled for the subject.
    ///
    /// `None` only when the provider is unavailable and no static default
    /// exists for the flag.
    pub fn has_feature(&self, flag_name: &str, subject: Option<&dyn Subject>) -> Option<bool> {
        self.evaluate_feature(flag_name, subject).into_value()
    }

    /// A feature variable for the subject. `None` in static mode and on
    /// provider failure.
    pub fn get_feature_variable(
        &self,
        flag_name: &str,
        variable_name: &str,
        subject: Option<&dyn Subject>,
    ) -> Option<Value> {
        self.evaluate_variable(flag_name, variable_name, subject)
            .into_value()
    }

    /// [`has_feature`](Self::has_feature) with provenance.
    pub fn evaluate_feature(
        &self,
        flag_name: &str,
        subject: Option<&dyn Subject>,
    ) -> Evaluation<Option<bool>> {
        let fallback = Fallback::value(self.config.static_default(flag_name));
        if !self.mode.is_remote() {
            return fallback.static_mode();
        }

        let key = namespace(flag_name, &self.config);
        let user_id = identify(subject);
        let attributes = attributes_of(subject);
        flagway_log::debug!(target: "flagway::gateway", "hasFeature {} for {}", key, user_id);

        let result = self
            .provider
            .is_feature_enabled(&key, &user_id, &attributes)
            .map(Some);
        let evaluation = fallback.resolve(result);
        self.report(Operation::HasFeature, key, &evaluation);
        evaluation
    }

    /// [`get_feature_variable`](Self::get_feature_variable) with provenance.
    pub fn evaluate_variable(
        &self,
        flag_name: &str,
        variable_name: &str,
        subject: Option<&dyn Subject>,
    ) -> Evaluation<Option<Value>> {
        let fallback = Fallback::value(None);
        if !self.mode.is_remote() {
            return fallback.static_mode();
        }

        let key = namespace(flag_name, &self.config);
        let user_id = identify(subject);
        let attributes = attributes_of(subject);
        flagway_log::debug!(
            target: "flagway::gateway",
            "getFeatureVariable {}.{} for {}",
            key,
            variable_name,
            user_id
        );

        let result = self
            .provider
            .feature_variable(&key, variable_name, &user_id, &attributes);
        let evaluation = fallback.resolve(result);
        self.report(Operation::GetFeatureVariable, key, &evaluation);
        evaluation
    }

    fn report<T>(&self, operation: Operation, key: String, evaluation: &Evaluation<T>) {
        if let Some(source) = evaluation.error() {
            self.logger.error(&EvaluationFailure {
                operation,
                key,
                source: source.clone(),
            });
        }
    }
}

impl fmt::Debug for FlagGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagGateway")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
