//! Provider failures.

use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Anything a flag provider can fail with.
///
/// The gateway never surfaces these to callers; they are logged and
/// replaced by static defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No datafile has been loaded yet
    #[error("Flag provider is not ready")]
    NotReady,

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature {feature} has no variable {variable}")]
    UnknownVariable { feature: String, variable: String },

    /// The feature evaluated to a value of the wrong type
    #[error("Feature {feature} did not evaluate to a {expected}")]
    TypeMismatch {
        feature: String,
        expected: &'static str,
    },

    /// The datafile could not be parsed
    #[error("Invalid datafile: {0}")]
    Datafile(String),

    /// The datafile source failed to deliver
    #[error("Datafile source error: {0}")]
    Source(String),

    /// The readiness channel was dropped before firing
    #[error("Flag provider shut down")]
    Closed,

    #[error("Flag provider error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Datafile(err.to_string())
    }
}
