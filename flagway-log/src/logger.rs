//! The `Logger` seam.
//!
//! The gateway never writes to stderr directly; it reports through an injected
//! [`Logger`] so embedding applications can route diagnostics wherever they
//! like. Implementations must not panic.

use crate::{Level, log_with_data};
use parking_lot::RwLock;
use serde_json::Value;
use std::error::Error;

/// Diagnostic sink used by the gateway and its composition root.
pub trait Logger: Send + Sync {
    /// Name the component subsequent lines belong to.
    fn set_scope(&self, scope: &str);

    /// Record an informational message with an optional payload.
    fn info(&self, message: &str, data: Option<&Value>);

    /// Record a failure. The source chain is walked and included.
    fn error(&self, error: &dyn Error);
}

/// Render an error and its `source()` chain as `outer: inner: root`.
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// [`Logger`] that writes through the crate's global formatter, using its
/// scope as the log target.
#[derive(Debug)]
pub struct ScopedLogger {
    scope: RwLock<String>,
}

impl ScopedLogger {
    pub fn new() -> Self {
        Self::with_scope("flagway")
    }

    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: RwLock::new(scope.into()),
        }
    }

    pub fn scope(&self) -> String {
        self.scope.read().clone()
    }
}

impl Default for ScopedLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for ScopedLogger {
    fn set_scope(&self, scope: &str) {
        *self.scope.write() = scope.to_string();
    }

    fn info(&self, message: &str, data: Option<&Value>) {
        let scope = self.scope.read();
        log_with_data(Level::Info, &scope, message, data);
    }

    fn error(&self, error: &dyn Error) {
        let scope = self.scope.read();
        log_with_data(Level::Error, &scope, &error_chain(error), None);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn set_scope(&self, _scope: &str) {}

    fn info(&self, _message: &str, _data: Option<&Value>) {}

    fn error(&self, _error: &dyn Error) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "hasFeature failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "provider not ready")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    impl Error for Inner {}

    #[test]
    fn test_error_chain_walks_sources() {
        assert_eq!(
            error_chain(&Outer(Inner)),
            "hasFeature failed: provider not ready"
        );
        assert_eq!(error_chain(&Inner), "provider not ready");
    }

    #[test]
    fn test_scoped_logger_scope() {
        let logger = ScopedLogger::new();
        assert_eq!(logger.scope(), "flagway");

        logger.set_scope("feature flags");
        assert_eq!(logger.scope(), "feature flags");

        logger.info("Feature Flags are loaded", None);
        logger.error(&Outer(Inner));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scoped_logger_shared_across_tasks() {
        let logger = std::sync::Arc::new(ScopedLogger::new());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let logger = logger.clone();
                tokio::spawn(async move {
                    logger.set_scope(&format!("worker {}", i));
                    logger.info("tick", None);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(logger.scope().starts_with("worker "));
    }

    #[test]
    fn test_noop_logger_is_object_safe() {
        let logger: Box<dyn Logger> = Box::new(NoopLogger);
        logger.set_scope("anything");
        logger.info("ignored", Some(&Value::Null));
        logger.error(&Inner);
    }
}
