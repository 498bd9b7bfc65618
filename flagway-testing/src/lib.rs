//! Testing utilities for Flagway.
//!
//! ## Quick Start
//!
//! ```
//! use flagway_config::GatewayConfig;
//! use flagway_features::FlagGateway;
//! use flagway_testing::*;
//! use std::sync::Arc;
//!
//! let provider = MockFlagProvider::new().with_enabled("BE_checkout", true);
//! let logger = CapturingLogger::new();
//!
//! let config = GatewayConfig::builder().environment_key("test").build().unwrap();
//! let gateway = FlagGateway::new(config, Arc::new(provider.clone()), Arc::new(logger.clone()));
//!
//! assert_eq!(gateway.has_feature("checkout", None), Some(true));
//! assert_eq!(provider.last_call().unwrap().key.as_deref(), Some("BE_checkout"));
//! assert_eq!(logger.scope(), "feature flags");
//! ```

pub mod logger;
pub mod mock;

pub use logger::{CapturingLogger, LogEntry};
pub use mock::{
    ENABLED_FEATURES, FEATURE_VARIABLE, IS_FEATURE_ENABLED, MockFlagProvider, ProviderCall,
};
