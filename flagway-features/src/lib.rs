//! Feature flag gateway.
//!
//! Application code asks [`FlagGateway`] whether a feature is on, by business
//! name and for a subject. The gateway namespaces the name, normalizes the
//! subject and delegates to a [`FlagProvider`]. Whatever the provider does,
//! the caller gets an answer: failures are logged and served from the static
//! defaults in [`GatewayConfig`](flagway_config::GatewayConfig).
//!
//! # Quick Start
//!
//! ```
//! use flagway_config::GatewayConfig;
//! use flagway_features::FlagGateway;
//! use flagway_features::local::{Datafile, FeatureFlag, LocalProvider};
//! use flagway_log::NoopLogger;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let config = GatewayConfig::builder()
//!     .environment_key("production")
//!     .static_default("checkout", false)
//!     .build()?;
//!
//! let provider = LocalProvider::with_datafile(Datafile::new(vec![
//!     FeatureFlag::boolean("BE_checkout", true),
//! ]));
//! let gateway = FlagGateway::new(config, Arc::new(provider), Arc::new(NoopLogger));
//!
//! let user = json!({"_id": "u-1", "country": "PT"});
//! assert_eq!(gateway.has_feature("checkout", Some(&user)), Some(true));
//!
//! // unknown to the provider: served from static defaults, or None
//! assert_eq!(gateway.has_feature("search", Some(&user)), None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Subjects
//!
//! Any type can be a subject by implementing [`Identity`] and [`Subject`].
//! `serde_json::Value`, `String` and `&str` are supported out of the box.

pub mod error;
pub mod fallback;
pub mod gateway;
pub mod local;
pub mod mode;
pub mod naming;
pub mod provider;
pub mod subject;

pub use error::{ProviderError, ProviderResult};
pub use fallback::{Evaluation, Fallback, ValueSource};
pub use gateway::{EvaluationFailure, FlagGateway, LOG_SCOPE, Operation};
pub use local::{DatafileSource, FileSource, LocalProvider};
pub use mode::{GatewayMode, is_remote_mode_active};
pub use naming::namespace;
pub use provider::{FlagProvider, Readiness, ReadySignal};
pub use subject::{
    ANONYMOUS_ID, Attribute, AttributeValue, Attributes, Identity, RECOGNIZED_ATTRIBUTES,
    Subject, attributes_of, identify, serialize_value,
};
