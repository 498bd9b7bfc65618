//! Integration tests for the local provider and its file source

use flagway_config::GatewayConfig;
use flagway_features::local::{Condition, FeatureFlag, Operator, TargetingRule};
use flagway_features::*;
use flagway_log::{Logger, NoopLogger};
use serde_json::{Value, json};
use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Errors(Mutex<Vec<String>>);

impl Logger for Errors {
    fn set_scope(&self, _scope: &str) {}

    fn info(&self, _message: &str, _data: Option<&Value>) {}

    fn error(&self, error: &dyn Error) {
        self.0.lock().unwrap().push(flagway_log::error_chain(error));
    }
}

fn write_datafile(dir: &Path, environment: &str, document: Value) {
    std::fs::write(
        dir.join(format!("{}.json", environment)),
        serde_json::to_vec(&document).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn test_refresh_from_file_source() {
    let dir = tempfile::tempdir().unwrap();
    write_datafile(
        dir.path(),
        "staging",
        json!({
            "revision": "1",
            "features": [
                {"key": "BE_checkout", "default_variation": true, "variables": {"limit": 5}}
            ]
        }),
    );

    let provider = LocalProvider::new();
    let source = FileSource::new(dir.path());
    provider.refresh(&source, "staging").await.unwrap();

    assert!(provider.is_ready());
    assert_eq!(provider.revision().as_deref(), Some("1"));
    assert_eq!(
        provider.feature_variable("BE_checkout", "limit", "all", &Attributes::new()),
        Ok(Some(json!(5)))
    );
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_datafile() {
    let dir = tempfile::tempdir().unwrap();
    write_datafile(
        dir.path(),
        "staging",
        json!({"revision": "1", "features": [{"key": "BE_a", "default_variation": true}]}),
    );

    let provider = LocalProvider::new();
    let source = FileSource::new(dir.path());
    provider.refresh(&source, "staging").await.unwrap();

    std::fs::write(dir.path().join("staging.json"), "not json").unwrap();
    let err = provider.refresh(&source, "staging").await.unwrap_err();

    assert!(matches!(err, ProviderError::Datafile(_)));
    assert_eq!(provider.revision().as_deref(), Some("1"));
    assert_eq!(provider.is_feature_enabled("BE_a", "all", &Attributes::new()), Ok(true));
}

#[tokio::test]
async fn test_spawned_refresh_marks_ready() {
    let dir = tempfile::tempdir().unwrap();
    write_datafile(
        dir.path(),
        "production",
        json!({"features": [{"key": "BE_search", "default_variation": true}]}),
    );

    let provider = LocalProvider::new();
    let ready = provider.ready();
    let task = provider.spawn_refresh(
        Arc::new(FileSource::new(dir.path())),
        "production",
        Duration::from_millis(20),
        Arc::new(NoopLogger),
    );

    tokio::time::timeout(Duration::from_secs(2), ready.wait())
        .await
        .expect("provider should become ready")
        .unwrap();
    task.abort();

    assert_eq!(
        provider.enabled_features("all", &Attributes::new()).unwrap(),
        vec!["BE_search".to_string()]
    );
}

#[tokio::test]
async fn test_spawned_refresh_logs_failures() {
    let dir = tempfile::tempdir().unwrap();
    let logger = Arc::new(Errors::default());

    let provider = LocalProvider::new();
    let task = provider.spawn_refresh(
        Arc::new(FileSource::new(dir.path())),
        "missing",
        Duration::from_millis(10),
        logger.clone(),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();

    let errors = logger.0.lock().unwrap();
    assert!(!errors.is_empty());
    assert!(errors[0].starts_with("Datafile refresh failed for environment missing"));
    assert!(!provider.is_ready());
}

#[test]
fn test_gateway_over_local_provider() {
    let flag = FeatureFlag::boolean("BE_coaching", false).with_rule(
        TargetingRule::new(true).with_condition(Condition::new(
            "isCoach",
            Operator::In,
            ["true"],
        )),
    );
    let provider = LocalProvider::with_datafile(local::Datafile::new(vec![flag]));

    let config = GatewayConfig::builder()
        .environment_key("production")
        .static_default("coaching", true)
        .build()
        .unwrap();
    let gateway = FlagGateway::new(config, Arc::new(provider), Arc::new(NoopLogger));

    let coach = json!({"_id": "u-1", "isCoach": true});
    let learner = json!({"_id": "u-2", "isCoach": false});

    assert_eq!(gateway.has_feature("coaching", Some(&coach)), Some(true));
    assert_eq!(gateway.has_feature("coaching", Some(&learner)), Some(false));

    // the provider knows no variables for this flag
    let evaluation = gateway.evaluate_variable("coaching", "limit", Some(&coach));
    assert_eq!(evaluation.value(), &None);
    assert!(matches!(
        evaluation.error(),
        Some(ProviderError::UnknownVariable { .. })
    ));
}

#[test]
fn test_not_ready_provider_serves_static_defaults() {
    let config = GatewayConfig::builder()
        .environment_key("production")
        .static_default("coaching", true)
        .build()
        .unwrap();
    let provider = LocalProvider::from_config(&config).unwrap();
    let gateway = FlagGateway::new(config, Arc::new(provider), Arc::new(NoopLogger));

    let evaluation = gateway.evaluate_feature("coaching", None);
    assert_eq!(evaluation.value(), &Some(true));
    assert_eq!(evaluation.error(), Some(&ProviderError::NotReady));
}

#[tokio::test]
async fn test_zero_refresh_period_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    write_datafile(
        dir.path(),
        "production",
        json!({"features": [{"key": "BE_search", "default_variation": true}]}),
    );

    let provider = LocalProvider::new();
    let ready = provider.ready();
    let task = provider.spawn_refresh(
        Arc::new(FileSource::new(dir.path())),
        "production",
        Duration::ZERO,
        Arc::new(NoopLogger),
    );

    tokio::time::timeout(Duration::from_secs(2), ready.wait())
        .await
        .expect("provider should become ready")
        .unwrap();
    assert!(!task.is_finished());
    task.abort();
}
