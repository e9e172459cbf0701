//! Synchronous delivery under a global subscriber. Lives in its own binary:
//! the global default can only be set once per process.

use cloud_log_config::{CloudLogConfig, CloudLogEnv, DeliveryMode, apply_env_overrides};
use cloud_log_domain::LogLevel;
use cloud_log_infra::init_global;
use serde_json::{Value, json};
use std::error::Error;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn Error + Send + Sync>>;
type Submission = Result<Duration, Box<dyn Error + Send + Sync>>;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::test(flavor = "multi_thread")]
async fn http_stack_events_do_not_loop_back_into_the_client() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut config = CloudLogConfig::default();
    config.client.project_id = Some("demo".to_owned());
    config.client.log_id = Some("app".to_owned());
    config.client.base_url = format!("{}/v2", server.uri());
    config.client.delivery = DeliveryMode::Synchronous;
    config.batch.flush_timeout_ms = 3_000;
    config.layer.min_level = LogLevel::Debug;
    // Everything at debug, including the HTTP client's own events; the mock
    // server's logging is not under test.
    config.diagnostics.filter = "debug,wiremock=off".to_owned();
    let config = apply_env_overrides(config, &CloudLogEnv::default())?;

    let elapsed = tokio::task::spawn_blocking(move || -> Submission {
        let guard = init_global(&config, &CloudLogEnv::default())?;
        let started = Instant::now();
        tracing::info!(target: "checkout", order = 7_u64, "hello");
        let elapsed = started.elapsed();
        guard.flush()?;
        Ok(elapsed)
    })
    .await??;

    assert!(elapsed < FLUSH_TIMEOUT, "submission waited {elapsed:?}");

    let requests = server
        .received_requests()
        .await
        .ok_or("request recording disabled")?;
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json()?;
    let entries = body["entries"].as_array().ok_or("entries missing")?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["jsonPayload"]["msg"], "hello");
    assert_eq!(entries[0]["jsonPayload"]["order"], 7);
    Ok(())
}
