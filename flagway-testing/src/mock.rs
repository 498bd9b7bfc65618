// Mock flag provider for testing

use flagway_features::{
    Attributes, FlagProvider, ProviderError, ProviderResult, Readiness, ReadySignal,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const IS_FEATURE_ENABLED: &str = "is_feature_enabled";
pub const FEATURE_VARIABLE: &str = "feature_variable";
pub const ENABLED_FEATURES: &str = "enabled_features";

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderCall {
    pub method: &'static str,
    /// `None` for `enabled_features`
    pub key: Option<String>,
    pub variable: Option<String>,
    pub user_id: String,
    pub attributes: Attributes,
}

#[derive(Default)]
struct State {
    calls: Vec<ProviderCall>,
    enabled: HashMap<String, bool>,
    variables: HashMap<(String, String), Value>,
    failure: Option<ProviderError>,
}

/// Scripted [`FlagProvider`] that records every call
///
/// Unknown keys answer `UnknownFeature`. Clones share state, so a test can
/// hand one clone to the gateway and inspect the other.
#[derive(Clone)]
pub struct MockFlagProvider {
    state: Arc<Mutex<State>>,
    readiness: Readiness,
}

impl MockFlagProvider {
    /// A ready provider with no flags
    pub fn new() -> Self {
        let provider = Self::pending();
        provider.mark_ready();
        provider
    }

    /// A provider whose ready signal has not fired
    pub fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            readiness: Readiness::new(),
        }
    }

    /// A ready provider failing every evaluation with `error`
    pub fn failing(error: ProviderError) -> Self {
        let provider = Self::new();
        provider.set_failure(Some(error));
        provider
    }

    pub fn with_enabled(self, key: impl Into<String>, enabled: bool) -> Self {
        self.state.lock().enabled.insert(key.into(), enabled);
        self
    }

    pub fn with_variable(
        self,
        key: impl Into<String>,
        variable: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.state
            .lock()
            .variables
            .insert((key.into(), variable.into()), value.into());
        self
    }

    /// Start or stop failing
    pub fn set_failure(&self, failure: Option<ProviderError>) {
        self.state.lock().failure = failure;
    }

    pub fn mark_ready(&self) {
        self.readiness.mark_ready();
    }

    /// Get the number of calls
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    pub fn last_call(&self) -> Option<ProviderCall> {
        self.state.lock().calls.last().cloned()
    }

    /// Check if a method was called
    pub fn was_called(&self, method: &str) -> bool {
        self.state.lock().calls.iter().any(|c| c.method == method)
    }

    /// Clear all recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: ProviderCall) -> parking_lot::MutexGuard<'_, State> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state
    }
}

impl Default for MockFlagProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagProvider for MockFlagProvider {
    fn ready(&self) -> ReadySignal {
        self.readiness.signal()
    }

    fn is_feature_enabled(
        &self,
        key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<bool> {
        let state = self.record(ProviderCall {
            method: IS_FEATURE_ENABLED,
            key: Some(key.to_string()),
            variable: None,
            user_id: user_id.to_string(),
            attributes: attributes.clone(),
        });

        if let Some(ref err) = state.failure {
            return Err(err.clone());
        }
        state
            .enabled
            .get(key)
            .copied()
            .ok_or_else(|| ProviderError::UnknownFeature(key.to_string()))
    }

    fn feature_variable(
        &self,
        key: &str,
        variable: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<Option<Value>> {
        let state = self.record(ProviderCall {
            method: FEATURE_VARIABLE,
            key: Some(key.to_string()),
            variable: Some(variable.to_string()),
            user_id: user_id.to_string(),
            attributes: attributes.clone(),
        });

        if let Some(ref err) = state.failure {
            return Err(err.clone());
        }
        Ok(state
            .variables
            .get(&(key.to_string(), variable.to_string()))
            .cloned())
    }

    fn enabled_features(&self, user_id: &str, attributes: &Attributes) -> ProviderResult<Vec<String>> {
        let state = self.record(ProviderCall {
            method: ENABLED_FEATURES,
            key: None,
            variable: None,
            user_id: user_id.to_string(),
            attributes: attributes.clone(),
        });

        if let Some(ref err) = state.failure {
            return Err(err.clone());
        }
        let mut keys: Vec<String> = state
            .enabled
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
