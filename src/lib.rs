// Flagway - a resilient feature flag gateway
//
// Application code asks whether a feature is on by business name and subject;
// the gateway namespaces the name, normalizes the subject, asks the flag
// provider and falls back to static defaults whenever the provider fails.

pub mod bootstrap;

pub use bootstrap::{Bootstrap, BootstrapError, Runtime, announce_ready};

pub use flagway_config;
pub use flagway_features;
pub use flagway_log;

#[cfg(feature = "testing")]
pub use flagway_testing;

pub use flagway_config::{ConfigError, ConfigManager, GatewayConfig};
pub use flagway_features::{
    Evaluation, FlagGateway, FlagProvider, Identity, LocalProvider, ProviderError, Subject,
    ValueSource,
};
pub use flagway_log::{Logger, ScopedLogger};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Bootstrap, Evaluation, FlagGateway, FlagProvider, GatewayConfig, Identity,
        LocalProvider, Logger, ProviderError, Runtime, ScopedLogger, Subject, ValueSource,
    };
    pub use flagway_features::local::{Datafile, FeatureFlag, FileSource};
    pub use flagway_features::{Attribute, AttributeValue, Attributes};
}
