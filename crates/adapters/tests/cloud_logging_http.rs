//! Cloud Logging client integration tests against a mock server.
#![allow(missing_docs)]

use cloud_log_adapters::{CloudLoggingClient, CloudLoggingClientOptions, MonitoredResource};
use cloud_log_config::DeliveryMode;
use cloud_log_domain::{EntryHeader, FieldSet, LogEntry, LogLevel};
use cloud_log_ports::LogClientPort;
use cloud_log_shared::{ErrorClass, ErrorCode, SecretString};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::error::Error;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

type TestResult = Result<(), Box<dyn Error>>;

fn options(server: &MockServer) -> CloudLoggingClientOptions {
    CloudLoggingClientOptions {
        project_id: "demo-project".into(),
        log_id: "checkout/api".into(),
        base_url: format!("{}/v2", server.uri()).into(),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        access_token: Some(SecretString::new("example")), // pragma: allowlist secret
        resource: MonitoredResource {
            resource_type: "k8s_container".to_owned(),
            labels: BTreeMap::from([("cluster_name".to_owned(), "prod".to_owned())]),
        },
        labels: BTreeMap::from([("team".to_owned(), "payments".to_owned())]),
        max_entries: 100,
        flush_interval: Duration::from_secs(60),
        buffer_capacity: 64,
        flush_timeout: Duration::from_secs(10),
        delivery: DeliveryMode::Buffered,
        ping_on_connect: false,
    }
}

fn entry(level: LogLevel, message: &str, fields: &[(&str, i64)]) -> LogEntry {
    let payload: FieldSet = fields.iter().copied().collect();
    LogEntry::from_header(EntryHeader::new(level, message), payload)
}

async fn mount_status(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn bodies(server: &MockServer) -> Result<Vec<Value>, Box<dyn Error>> {
    let requests: Vec<Request> = server
        .received_requests()
        .await
        .ok_or("request recording disabled")?;
    Ok(requests
        .iter()
        .map(Request::body_json::<Value>)
        .collect::<Result<_, _>>()?)
}

#[tokio::test(flavor = "multi_thread")]
async fn flush_writes_buffered_entries_in_one_request() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .and(header("authorization", "Bearer example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let options = options(&server);
    tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        client.log(entry(LogLevel::Error, "failed", &[("retries", 3)]))?;
        client.log(entry(LogLevel::Info, "recovered", &[]))?;
        client.flush()?;
        client.close()
    })
    .await??;

    let bodies = bodies(&server).await?;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["logName"], "projects/demo-project/logs/checkout%2Fapi");
    assert_eq!(
        body["resource"],
        json!({ "type": "k8s_container", "labels": { "cluster_name": "prod" } })
    );
    assert_eq!(body["labels"], json!({ "team": "payments" }));
    assert!(body.get("dryRun").is_none());

    let entries = body["entries"].as_array().ok_or("entries missing")?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["severity"], "ERROR");
    assert_eq!(
        entries[0]["jsonPayload"],
        json!({ "retries": 3, "msg": "failed" })
    );
    assert_eq!(entries[1]["severity"], "INFO");
    assert!(entries[0]["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    assert_ne!(entries[0]["insertId"], entries[1]["insertId"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_batches_are_written_without_flush() -> TestResult {
    let server = MockServer::start().await;
    mount_status(&server, 200, json!({})).await;

    let mut options = options(&server);
    options.max_entries = 2;
    tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        for index in 0..5 {
            client.log(entry(LogLevel::Debug, "tick", &[("index", index)]))?;
        }
        client.flush()?;
        client.close()
    })
    .await??;

    let sizes: Vec<usize> = bodies(&server)
        .await?
        .iter()
        .map(|body| body["entries"].as_array().map_or(0, Vec::len))
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn flush_interval_sends_partial_batches() -> TestResult {
    let server = MockServer::start().await;
    mount_status(&server, 200, json!({})).await;

    let mut options = options(&server);
    options.flush_interval = Duration::from_millis(20);
    let client = tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        client.log(entry(LogLevel::Warn, "slow", &[]))?;
        Ok::<_, cloud_log_shared::ErrorEnvelope>(client)
    })
    .await??;

    let started = Instant::now();
    while bodies(&server).await?.is_empty() {
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "batch was not written by the interval timer"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tokio::task::spawn_blocking(move || client.close()).await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn buffered_failures_surface_on_flush_once() -> TestResult {
    let server = MockServer::start().await;
    mount_status(
        &server,
        503,
        json!({ "error": { "code": 503, "message": "backend unavailable", "status": "UNAVAILABLE" } }),
    )
    .await;

    let options = options(&server);
    let (first, second) = tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        client.log(entry(LogLevel::Info, "lost", &[]))?;
        let first = client.flush();
        let second = client.flush();
        drop(client);
        Ok::<_, cloud_log_shared::ErrorEnvelope>((first, second))
    })
    .await??;

    let error = first.err().ok_or("expected flush failure")?;
    assert_eq!(error.code, ErrorCode::new("client", "http_status"));
    assert_eq!(error.class, ErrorClass::Retriable);
    assert_eq!(error.message, "backend unavailable");
    assert_eq!(error.metadata.get("failed_batches").map(String::as_str), Some("1"));
    assert_eq!(error.metadata.get("status").map(String::as_str), Some("503"));
    assert!(second.is_ok(), "failures are reported once");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn synchronous_delivery_returns_write_errors_from_log() -> TestResult {
    let server = MockServer::start().await;
    mount_status(
        &server,
        403,
        json!({ "error": { "code": 403, "message": "denied", "status": "PERMISSION_DENIED" } }),
    )
    .await;

    let mut options = options(&server);
    options.delivery = DeliveryMode::Synchronous;
    let (logged, flushed) = tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        let logged = client.log(entry(LogLevel::Error, "rejected", &[]));
        let flushed = client.flush();
        drop(client);
        Ok::<_, cloud_log_shared::ErrorEnvelope>((logged, flushed))
    })
    .await??;

    let error = logged.err().ok_or("expected log failure")?;
    assert_eq!(error.code, ErrorCode::new("client", "unauthorized"));
    assert_eq!(error.class, ErrorClass::NonRetriable);
    assert!(flushed.is_ok(), "synchronous failures are not reported twice");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ping_on_connect_sends_dry_run_and_fails_construction() -> TestResult {
    let server = MockServer::start().await;
    mount_status(&server, 401, json!({ "error": { "message": "no token" } })).await;

    let mut options = options(&server);
    options.ping_on_connect = true;
    let result = tokio::task::spawn_blocking(move || CloudLoggingClient::connect(options)).await?;

    let error = result.err().ok_or("expected ping failure")?;
    assert_eq!(error.code, ErrorCode::new("client", "unauthorized"));

    let bodies = bodies(&server).await?;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["dryRun"], true);
    assert_eq!(bodies[0]["entries"][0]["insertId"], "ping");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_buffer_is_a_retriable_error() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let mut options = options(&server);
    options.max_entries = 1;
    options.buffer_capacity = 1;
    let outcome = tokio::task::spawn_blocking(move || {
        let client = CloudLoggingClient::connect(options)?;
        let mut refused = None;
        for _ in 0..10 {
            if let Err(error) = client.log(entry(LogLevel::Info, "burst", &[])) {
                refused = Some(error);
                break;
            }
        }
        drop(client);
        Ok::<_, cloud_log_shared::ErrorEnvelope>(refused)
    })
    .await??;

    let error = outcome.ok_or("expected the buffer to fill")?;
    assert_eq!(error.code, ErrorCode::new("client", "buffer_full"));
    assert_eq!(error.class, ErrorClass::Retriable);
    Ok(())
}
