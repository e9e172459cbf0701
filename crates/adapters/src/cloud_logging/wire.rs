//! JSON bodies of the Cloud Logging v2 `entries:write` API.

use cloud_log_domain::{FieldSet, LogEntry, Severity, SourceLocation, format_timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource every entry is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    /// Resource type, e.g. `global` or `k8s_container`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Labels identifying the resource instance.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WriteEntriesRequest<'a> {
    pub log_name: &'a str,
    pub resource: &'a MonitoredResource,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: &'a BTreeMap<String, String>,
    pub entries: Vec<WireEntry>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireEntry {
    timestamp: String,
    severity: Severity,
    json_payload: FieldSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_location: Option<WireSourceLocation>,
    insert_id: String,
}

impl WireEntry {
    pub(super) fn new(entry: LogEntry, insert_id: String) -> Self {
        Self {
            timestamp: format_timestamp(&entry.timestamp),
            severity: entry.severity,
            json_payload: entry.payload,
            source_location: entry.source_location.map(WireSourceLocation::from),
            insert_id,
        }
    }
}

// int64 fields travel as JSON strings in the REST mapping.
#[derive(Debug, Serialize)]
struct WireSourceLocation {
    file: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<Box<str>>,
}

impl From<SourceLocation> for WireSourceLocation {
    fn from(location: SourceLocation) -> Self {
        Self {
            file: location.file,
            line: location.line.map(|line| line.to_string()),
            function: location.function,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GoogleErrorResponse {
    pub error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct GoogleErrorDetail {
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// `projects/{project}/logs/{log id}` with the log id URL-escaped.
pub(super) fn log_name(project_id: &str, log_id: &str) -> String {
    let escaped: String = url::form_urlencoded::byte_serialize(log_id.as_bytes()).collect();
    format!("projects/{project_id}/logs/{escaped}")
}
