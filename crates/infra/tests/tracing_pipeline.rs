//! End-to-end tests: `tracing` macros through the layer to a log client.

use cloud_log_config::{
    CloudLogConfig, CloudLogEnv, ValidatedCloudLogConfig, apply_env_overrides,
    load_cloud_log_config_from_path,
};
use cloud_log_domain::{LogEntry, Severity};
use cloud_log_infra::{build_cloud_logging, build_with_client};
use cloud_log_shared::SecretString;
use cloud_log_testkit::fixtures::fixture_path;
use cloud_log_testkit::in_memory::RecordingLogClient;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn Error>>;

fn config_for(base_url: &str) -> Result<ValidatedCloudLogConfig, Box<dyn Error>> {
    let mut config = CloudLogConfig::default();
    config.client.project_id = Some("demo-project".to_owned());
    config.client.log_id = Some("checkout".to_owned());
    config.client.base_url = base_url.to_owned();
    config.layer.redact_secret_fields = true;
    Ok(apply_env_overrides(config, &CloudLogEnv::default())?)
}

fn messages(entries: &[LogEntry]) -> Vec<&str> {
    entries.iter().filter_map(LogEntry::message).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn events_are_delivered_to_cloud_logging() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .and(header("authorization", "Bearer example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&format!("{}/v2", server.uri()))?;
    let env = CloudLogEnv {
        access_token: Some(SecretString::new("example")), // pragma: allowlist secret
        ..CloudLogEnv::default()
    };

    tokio::task::spawn_blocking(move || {
        let logging = build_cloud_logging(&config, &env)?;
        let subscriber = tracing_subscriber::registry().with(logging.layer);
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("request", request_id = "abc123");
            let _entered = span.enter();
            tracing::error!(retries = 3, password = "hunter2", "failed");
        });
        logging.guard.flush()
    })
    .await??;

    let requests = server
        .received_requests()
        .await
        .ok_or("request recording disabled")?;
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json()?;
    assert_eq!(body["logName"], "projects/demo-project/logs/checkout");
    assert_eq!(body["resource"]["type"], "global");

    let entry = &body["entries"][0];
    assert_eq!(entry["severity"], "ERROR");
    assert_eq!(entry["jsonPayload"]["request_id"], "abc123");
    assert_eq!(entry["jsonPayload"]["retries"], 3);
    assert_eq!(entry["jsonPayload"]["password"], "[REDACTED]");
    assert_eq!(entry["jsonPayload"]["msg"], "failed");
    assert_eq!(entry["jsonPayload"]["target"], "tracing_pipeline");
    assert!(
        entry["sourceLocation"]["file"]
            .as_str()
            .is_some_and(|file| file.ends_with("tracing_pipeline.rs"))
    );
    Ok(())
}

#[test]
fn default_config_keeps_field_values_unchanged() -> TestResult {
    let mut config = CloudLogConfig::default();
    config.client.project_id = Some("demo".to_owned());
    config.client.log_id = Some("app".to_owned());
    let config = apply_env_overrides(config, &CloudLogEnv::default())?;
    let client = Arc::new(RecordingLogClient::new());
    let logging = build_with_client(&config, client.clone());

    let subscriber = tracing_subscriber::registry().with(logging.layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(
            author = "ana",
            tokens_used = 42_i64,
            monkey = true,
            cache_key = "k1",
            api_token = "t-1",
            "done"
        );
    });

    let entries = client.take_entries();
    assert_eq!(entries.len(), 1);
    let payload = entries[0].payload.to_json();
    assert_eq!(payload["author"], "ana");
    assert_eq!(payload["tokens_used"], 42);
    assert_eq!(payload["monkey"], true);
    assert_eq!(payload["cache_key"], "k1");
    assert_eq!(payload["api_token"], "t-1");
    assert_eq!(payload["msg"], "done");
    Ok(())
}

#[test]
fn toml_fixture_configures_the_layer() -> TestResult {
    let config = load_cloud_log_config_from_path(
        Some(fixture_path("config/cloud-log-config.valid.toml").as_path()),
        None,
        &CloudLogEnv::default(),
    )?;
    let client = Arc::new(RecordingLogClient::new());
    let logging = build_with_client(&config, client.clone());

    let subscriber = tracing_subscriber::registry().with(logging.layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("below the minimum level");
        tracing::warn!(disk = "sda1", "disk almost full");
        tracing::error!(target: "hyper::proto", "dependency noise");
    });

    let entries = client.take_entries();
    assert_eq!(messages(&entries), vec!["disk almost full"]);
    assert_eq!(entries[0].severity, Severity::Warning);
    assert!(entries[0].source_location.is_none());

    drop(logging.guard);
    assert_eq!(client.flush_count(), 1);
    Ok(())
}

#[test]
fn env_overrides_reach_the_layer() -> TestResult {
    let env = CloudLogEnv::from_map(&BTreeMap::from([
        ("CLOUD_LOG_PROJECT_ID".to_owned(), "demo".to_owned()),
        ("CLOUD_LOG_LOG_ID".to_owned(), "app".to_owned()),
        ("CLOUD_LOG_MIN_LEVEL".to_owned(), "error".to_owned()),
    ]))?;
    let config = apply_env_overrides(CloudLogConfig::default(), &env)?;
    let client = Arc::new(RecordingLogClient::new());
    let logging = build_with_client(&config, client.clone());

    let subscriber = tracing_subscriber::registry().with(logging.layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("dropped");
        tracing::error!("kept");
        tracing::error!(log.level = "critical", "escalated");
    });

    let entries = client.take_entries();
    assert_eq!(messages(&entries), vec!["kept", "escalated"]);
    assert_eq!(entries[1].severity, Severity::Critical);
    Ok(())
}
