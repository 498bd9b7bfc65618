//! Whether the remote provider is consulted at all.

use flagway_config::{GatewayConfig, NO_REMOTE_ENVIRONMENT};

/// How the gateway answers queries for a given configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Ask the provider, falling back to static defaults on failure
    Remote,
    /// Serve static defaults without touching the provider
    Static,
}

impl GatewayMode {
    pub fn resolve(config: &GatewayConfig) -> Self {
        match config.environment_key() {
            None | Some(NO_REMOTE_ENVIRONMENT) => GatewayMode::Static,
            Some(_) => GatewayMode::Remote,
        }
    }

    pub fn is_remote(self) -> bool {
        self == GatewayMode::Remote
    }
}

/// Remote mode is active unless the environment key is absent, empty or `"none"`.
pub fn is_remote_mode_active(config: &GatewayConfig) -> bool {
    GatewayMode::resolve(config).is_remote()
}
