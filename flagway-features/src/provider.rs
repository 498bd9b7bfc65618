//! The provider seam.
//!
//! A [`FlagProvider`] is the external evaluation engine. The gateway only
//! needs the two evaluation calls; readiness and the enabled-feature listing
//! exist for startup diagnostics in the composition root.

use crate::error::{ProviderError, ProviderResult};
use crate::subject::Attributes;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Flag evaluation engine consumed by the gateway.
///
/// Evaluation calls are synchronous and must return promptly even before the
/// provider is ready, typically with [`ProviderError::NotReady`].
pub trait FlagProvider: Send + Sync {
    /// Fires once the provider has loaded its first datafile.
    fn ready(&self) -> ReadySignal;

    fn is_feature_enabled(
        &self,
        key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<bool>;

    fn feature_variable(
        &self,
        key: &str,
        variable: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<Option<Value>>;

    /// Keys of every feature enabled for the subject.
    fn enabled_features(&self, _user_id: &str, _attributes: &Attributes) -> ProviderResult<Vec<String>> {
        Ok(Vec::new())
    }
}

impl<P: FlagProvider + ?Sized> FlagProvider for Arc<P> {
    fn ready(&self) -> ReadySignal {
        (**self).ready()
    }

    fn is_feature_enabled(
        &self,
        key: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<bool> {
        (**self).is_feature_enabled(key, user_id, attributes)
    }

    fn feature_variable(
        &self,
        key: &str,
        variable: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> ProviderResult<Option<Value>> {
        (**self).feature_variable(key, variable, user_id, attributes)
    }

    fn enabled_features(&self, user_id: &str, attributes: &Attributes) -> ProviderResult<Vec<String>> {
        (**self).enabled_features(user_id, attributes)
    }
}

/// Owner side of a provider's readiness flag.
#[derive(Debug, Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flip to ready. Later calls are no-ops.
    pub fn mark_ready(&self) {
        self.tx.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> ReadySignal {
        ReadySignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaitable view of a [`Readiness`].
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// A signal that has already fired.
    pub fn ready() -> Self {
        let readiness = Readiness::new();
        readiness.mark_ready();
        readiness.signal()
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until ready. Fails with [`ProviderError::Closed`] if the
    /// provider is dropped first.
    pub async fn wait(mut self) -> ProviderResult<()> {
        self.rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| ProviderError::Closed)
    }
}
