//! Composition root.
//!
//! Wires a [`FlagGateway`] to its provider and logger, and owns the
//! background work around them: the readiness announcement and, for the
//! local provider, datafile refresh.

use flagway_config::{ConfigError, GatewayConfig, Validate};
use flagway_features::{
    ANONYMOUS_ID, Attributes, DatafileSource, FlagGateway, FlagProvider, LOG_SCOPE, LocalProvider,
    ProviderError,
};
use flagway_log::{Logger, ScopedLogger};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Flagway must be started inside a Tokio runtime")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Builds and starts a gateway.
///
/// ```
/// use flagway::Bootstrap;
/// use flagway_config::GatewayConfig;
///
/// # tokio_test::block_on(async {
/// let config = GatewayConfig::builder().static_default("checkout", true).build().unwrap();
/// let runtime = Bootstrap::new(config).start().unwrap();
///
/// assert_eq!(runtime.gateway().has_feature("checkout", None), Some(true));
/// runtime.shutdown();
/// # });
/// ```
pub struct Bootstrap {
    config: GatewayConfig,
    logger: Option<Arc<dyn Logger>>,
    provider: Option<Arc<dyn FlagProvider>>,
    source: Option<Arc<dyn DatafileSource>>,
}

impl Bootstrap {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            logger: None,
            provider: None,
            source: None,
        }
    }

    /// Bootstrap from `FLAGWAY_*` environment variables.
    pub fn from_env() -> Result<Self, BootstrapError> {
        Ok(Self::new(GatewayConfig::from_env()?))
    }

    /// Defaults to a [`ScopedLogger`].
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replace the default [`LocalProvider`].
    pub fn with_provider(mut self, provider: Arc<dyn FlagProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Datafile source polled by the default [`LocalProvider`]. Ignored when
    /// a custom provider is set or remote mode is off.
    pub fn with_source(mut self, source: Arc<dyn DatafileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate the configuration, build the gateway and spawn its
    /// background tasks.
    pub fn start(self) -> Result<Runtime, BootstrapError> {
        tokio::runtime::Handle::try_current().map_err(|_| BootstrapError::NoRuntime)?;
        self.config.validate()?;

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(ScopedLogger::new()));
        logger.set_scope(LOG_SCOPE);

        let mut tasks = Vec::new();
        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let local = LocalProvider::from_config(&self.config)?;
                if let (Some(source), Some(environment)) =
                    (self.source, remote_environment(&self.config))
                {
                    flagway_log::info!(
                        target: "flagway::bootstrap",
                        "Refreshing datafile for {} every {:?}",
                        environment,
                        self.config.refresh_interval()
                    );
                    tasks.push(local.spawn_refresh(
                        source,
                        environment,
                        self.config.refresh_interval(),
                        logger.clone(),
                    ));
                }
                Arc::new(local)
            }
        };

        tasks.push(tokio::spawn(announce_ready(
            provider.clone(),
            logger.clone(),
        )));

        let gateway = FlagGateway::new(self.config, provider, logger);
        Ok(Runtime { gateway, tasks })
    }
}

fn remote_environment(config: &GatewayConfig) -> Option<String> {
    flagway_features::is_remote_mode_active(config)
        .then(|| config.environment_key().map(str::to_string))
        .flatten()
}

/// Wait for the provider, then log that flags are loaded and which are on for
/// the anonymous subject.
pub async fn announce_ready(provider: Arc<dyn FlagProvider>, logger: Arc<dyn Logger>) {
    if let Err(err) = provider.ready().wait().await {
        logger.error(&err);
        return;
    }

    logger.info("Feature Flags are loaded", None);
    match provider.enabled_features(ANONYMOUS_ID, &Attributes::new()) {
        Ok(keys) => {
            let keys = Value::from(keys);
            logger.info("Enabled Feature flags", Some(&keys));
        }
        Err(err) => logger.error(&err),
    }
}

/// A started gateway and the tasks serving it. Dropping it stops the tasks.
pub struct Runtime {
    gateway: FlagGateway,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    pub fn gateway(&self) -> &FlagGateway {
        &self.gateway
    }

    pub fn task_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Stop background tasks and hand back the gateway, which keeps working
    /// with whatever the provider last loaded.
    pub fn shutdown(mut self) -> FlagGateway {
        self.abort_tasks();
        self.gateway.clone()
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagway_testing::{CapturingLogger, ENABLED_FEATURES, MockFlagProvider};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_start_outside_runtime_fails() {
        let result = Bootstrap::new(GatewayConfig::default()).start();
        assert!(matches!(result, Err(BootstrapError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_announce_ready_logs_enabled_flags() {
        let provider = MockFlagProvider::new()
            .with_enabled("BE_b", true)
            .with_enabled("BE_a", true);
        let logger = CapturingLogger::new();

        announce_ready(Arc::new(provider.clone()), Arc::new(logger.clone())).await;

        let infos = logger.infos();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].message, "Feature Flags are loaded");
        assert_eq!(infos[1].message, "Enabled Feature flags");
        assert_eq!(infos[1].data, Some(json!(["BE_a", "BE_b"])));

        let call = provider.last_call().unwrap();
        assert_eq!(call.method, ENABLED_FEATURES);
        assert_eq!(call.user_id, "all");
    }

    #[tokio::test]
    async fn test_announce_waits_for_ready() {
        let provider = MockFlagProvider::pending();
        let logger = CapturingLogger::new();
        let task = tokio::spawn(announce_ready(
            Arc::new(provider.clone()),
            Arc::new(logger.clone()),
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(logger.infos().is_empty());

        provider.mark_ready();
        task.await.unwrap();
        assert_eq!(logger.infos()[0].message, "Feature Flags are loaded");
    }

    #[tokio::test]
    async fn test_start_sets_scope() {
        let logger = CapturingLogger::new();
        let runtime = Bootstrap::new(GatewayConfig::default())
            .with_logger(Arc::new(logger.clone()))
            .start()
            .unwrap();

        assert_eq!(logger.scope(), "feature flags");
        assert!(!runtime.gateway().mode().is_remote());
    }

    #[tokio::test]
    async fn test_start_rejects_zero_refresh_interval() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "environment_key": "prod",
            "refresh_interval_ms": 0
        }))
        .unwrap();

        let result = Bootstrap::new(config)
            .with_logger(Arc::new(CapturingLogger::new()))
            .start();
        assert!(matches!(
            result,
            Err(BootstrapError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_remote_environment() {
        assert_eq!(remote_environment(&GatewayConfig::default()), None);

        let config = GatewayConfig::builder()
            .environment_key("prod")
            .build()
            .unwrap();
        assert_eq!(remote_environment(&config).as_deref(), Some("prod"));
    }
}
