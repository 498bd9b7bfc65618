//! Degrading provider failures to static defaults.
//!
//! The fallback is a plain value transformation,
//! `Result<T, ProviderError> -> Evaluation<T>`, so the error path can be
//! inspected without going through the logger.
//!
//! ```
//! use flagway_features::{Fallback, ProviderError, ValueSource};
//!
//! let fallback = Fallback::value(Some(false));
//! let evaluation = fallback.resolve(Err(ProviderError::NotReady));
//!
//! assert_eq!(evaluation.value(), &Some(false));
//! assert!(matches!(evaluation.source(), ValueSource::Fallback(ProviderError::NotReady)));
//! ```

use crate::error::ProviderError;

/// Where an evaluated value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// The provider answered
    Provider,
    /// Remote mode is off; the provider was not consulted
    StaticMode,
    /// The provider failed and the static default was served
    Fallback(ProviderError),
}

/// An evaluated value together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<T> {
    value: T,
    source: ValueSource,
}

impl<T> Evaluation<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    /// The provider error that forced a fallback, if any.
    pub fn error(&self) -> Option<&ProviderError> {
        match self.source {
            ValueSource::Fallback(ref err) => Some(err),
            _ => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error().is_some()
    }
}

/// A static value to serve when the provider cannot.
#[derive(Debug, Clone)]
pub struct Fallback<T> {
    value: T,
}

impl<T> Fallback<T> {
    pub fn value(value: T) -> Self {
        Self { value }
    }

    /// Serve the static value without consulting anything.
    pub fn static_mode(self) -> Evaluation<T> {
        Evaluation::new(self.value, ValueSource::StaticMode)
    }

    /// Keep a provider answer, or swap a failure for the static value.
    pub fn resolve(self, result: Result<T, ProviderError>) -> Evaluation<T> {
        match result {
            Ok(value) => Evaluation::new(value, ValueSource::Provider),
            Err(err) => Evaluation::new(self.value, ValueSource::Fallback(err)),
        }
    }
}

impl<T: Default> Default for Fallback<T> {
    fn default() -> Self {
        Self::value(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_keeps_provider_value() {
        let evaluation = Fallback::value(Some(false)).resolve(Ok(Some(true)));
        assert_eq!(evaluation.value(), &Some(true));
        assert_eq!(evaluation.source(), &ValueSource::Provider);
        assert!(!evaluation.is_fallback());
    }

    #[test]
    fn test_failure_serves_static_value() {
        let evaluation =
            Fallback::value(Some(true)).resolve(Err(ProviderError::UnknownFeature("BE_x".into())));
        assert_eq!(evaluation.into_value(), Some(true));
    }

    #[test]
    fn test_failure_exposes_error() {
        let evaluation = Fallback::<Option<bool>>::default().resolve(Err(ProviderError::NotReady));
        assert_eq!(evaluation.value(), &None);
        assert_eq!(evaluation.error(), Some(&ProviderError::NotReady));
    }

    #[test]
    fn test_static_mode() {
        let evaluation = Fallback::value(Some(true)).static_mode();
        assert_eq!(evaluation.source(), &ValueSource::StaticMode);
        assert_eq!(evaluation.error(), None);
    }
}
