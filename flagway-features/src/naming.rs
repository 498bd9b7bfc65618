//! Business flag names to provider keys.

use flagway_config::GatewayConfig;

/// Prefix `flag_name` with the configured namespace (`"BE_"` by default).
pub fn namespace(flag_name: &str, config: &GatewayConfig) -> String {
    let prefix = config.name_prefix();
    let mut key = String::with_capacity(prefix.len() + flag_name.len());
    key.push_str(prefix);
    key.push_str(flag_name);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        assert_eq!(namespace("test", &GatewayConfig::default()), "BE_test");
    }

    #[test]
    fn test_configured_prefix() {
        let config = GatewayConfig {
            name_prefix: Some("Z-".to_string()),
            ..GatewayConfig::default()
        };
        assert_eq!(namespace("test", &config), "Z-test");
        assert_eq!(namespace("", &config), "Z-");
    }
}
