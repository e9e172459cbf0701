//! HTTP transport for `entries:write`.

use super::wire::{GoogleErrorResponse, MonitoredResource, WireEntry, WriteEntriesRequest};
use cloud_log_domain::{EntryHeader, FieldSet, LogEntry, LogLevel};
use cloud_log_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result, SecretString};
use chrono::DateTime;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;

pub(super) struct Transport {
    http: reqwest::Client,
    endpoint: Box<str>,
    log_name: Box<str>,
    resource: MonitoredResource,
    labels: BTreeMap<String, String>,
}

pub(super) struct TransportSettings<'a> {
    pub base_url: &'a str,
    pub log_name: String,
    pub resource: MonitoredResource,
    pub labels: BTreeMap<String, String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub access_token: Option<&'a SecretString>,
}

impl Transport {
    pub(super) fn new(settings: TransportSettings<'_>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = settings.access_token {
            let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|_| {
                    ErrorEnvelope::expected(
                        ErrorCode::invalid_input(),
                        "access token contains invalid header characters",
                    )
                })?;
            auth_header.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_header);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("client", "init_failed"),
                    format!("failed to build Cloud Logging HTTP client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        let base_url = settings.base_url.trim_end_matches('/');
        Ok(Self {
            http,
            endpoint: format!("{base_url}/entries:write").into_boxed_str(),
            log_name: settings.log_name.into_boxed_str(),
            resource: settings.resource,
            labels: settings.labels,
        })
    }

    pub(super) async fn write_entries(&self, entries: Vec<LogEntry>) -> Result<()> {
        let entries = entries
            .into_iter()
            .map(|entry| WireEntry::new(entry, uuid::Uuid::new_v4().to_string()))
            .collect();
        self.send(entries, false).await
    }

    /// Dry-run write that checks reachability and permissions.
    pub(super) async fn ping(&self) -> Result<()> {
        let header = EntryHeader::new(LogLevel::Trace, "ping").with_timestamp(DateTime::UNIX_EPOCH);
        let entry = LogEntry::from_header(header, FieldSet::new());
        self.send(vec![WireEntry::new(entry, "ping".to_owned())], true)
            .await
    }

    async fn send(&self, entries: Vec<WireEntry>, dry_run: bool) -> Result<()> {
        let request = WriteEntriesRequest {
            log_name: &self.log_name,
            resource: &self.resource,
            labels: &self.labels,
            entries,
            dry_run,
        };

        let response = self
            .http
            .post(self.endpoint.as_ref())
            .json(&request)
            .send()
            .await
            .map_err(|error| map_reqwest_error(&error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_reqwest_error(&error))?;
        Err(map_http_error(status, &payload))
    }
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "Cloud Logging request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("Cloud Logging connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("client", "request_failed"),
        format!("Cloud Logging request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}

pub(super) fn map_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let parsed = serde_json::from_slice::<GoogleErrorResponse>(payload).ok();
    let message = parsed.as_ref().map_or_else(
        || format!("Cloud Logging request failed with status {}", status.as_u16()),
        |parsed| parsed.error.message.clone(),
    );

    let mut envelope = match status.as_u16() {
        401 | 403 => ErrorEnvelope::expected(ErrorCode::new("client", "unauthorized"), message),
        429 => ErrorEnvelope::unexpected(
            ErrorCode::new("client", "http_status"),
            message,
            ErrorClass::Retriable,
        ),
        _ if status.is_server_error() => ErrorEnvelope::unexpected(
            ErrorCode::new("client", "http_status"),
            message,
            ErrorClass::Retriable,
        ),
        _ => ErrorEnvelope::expected(ErrorCode::new("client", "http_status"), message),
    };

    envelope = envelope.with_metadata("status", status.as_u16().to_string());
    if let Some(api_status) = parsed.and_then(|parsed| parsed.error.status) {
        envelope = envelope.with_metadata("api_status", api_status);
    }
    envelope
}
