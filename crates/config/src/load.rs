//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{
    CloudLogConfig, CloudLogEnv, DeliveryMode, ValidatedCloudLogConfig, apply_env_overrides,
};
use cloud_log_domain::LogLevel;
use cloud_log_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`CloudLogEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`CloudLogConfig::default()`)
pub fn load_cloud_log_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &CloudLogEnv,
) -> Result<ValidatedCloudLogConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => CloudLogConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from an optional file path (`.json` or `.toml`).
pub fn load_cloud_log_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &CloudLogEnv,
) -> Result<ValidatedCloudLogConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => CloudLogConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let config_text = read_config_file(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    apply_env_overrides(config, env)
}

/// Load the config from std env and an optional file path.
pub fn load_cloud_log_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedCloudLogConfig, ErrorEnvelope> {
    let env = CloudLogEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_cloud_log_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &CloudLogConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &CloudLogConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<CloudLogConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<CloudLogConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct CloudLogConfigOverrides {
    version: Option<u32>,
    client: ClientConfigOverrides,
    batch: BatchConfigOverrides,
    layer: LayerConfigOverrides,
    diagnostics: DiagnosticsConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ClientConfigOverrides {
    project_id: Option<String>,
    log_id: Option<String>,
    base_url: Option<String>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    resource: ResourceConfigOverrides,
    labels: Option<BTreeMap<String, String>>,
    ping_on_connect: Option<bool>,
    delivery: Option<DeliveryMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ResourceConfigOverrides {
    #[serde(rename = "type")]
    resource_type: Option<String>,
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct BatchConfigOverrides {
    max_entries: Option<u32>,
    flush_interval_ms: Option<u64>,
    buffer_capacity: Option<u32>,
    flush_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LayerConfigOverrides {
    min_level: Option<LogLevel>,
    ignored_targets: Option<Vec<String>>,
    include_target: Option<bool>,
    include_source_location: Option<bool>,
    redact_secret_fields: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct DiagnosticsConfigOverrides {
    stderr_json: Option<bool>,
    filter: Option<String>,
}

fn apply_overrides(config: &mut CloudLogConfig, overrides: CloudLogConfigOverrides) {
    set(&mut config.version, overrides.version);

    let client = &mut config.client;
    let client_overrides = overrides.client;
    set_opt(&mut client.project_id, client_overrides.project_id);
    set_opt(&mut client.log_id, client_overrides.log_id);
    set(&mut client.base_url, client_overrides.base_url);
    set(
        &mut client.connect_timeout_ms,
        client_overrides.connect_timeout_ms,
    );
    set(
        &mut client.request_timeout_ms,
        client_overrides.request_timeout_ms,
    );
    set(
        &mut client.resource.resource_type,
        client_overrides.resource.resource_type,
    );
    set(&mut client.resource.labels, client_overrides.resource.labels);
    set(&mut client.labels, client_overrides.labels);
    set(&mut client.ping_on_connect, client_overrides.ping_on_connect);
    set(&mut client.delivery, client_overrides.delivery);

    let batch = &mut config.batch;
    set(&mut batch.max_entries, overrides.batch.max_entries);
    set(&mut batch.flush_interval_ms, overrides.batch.flush_interval_ms);
    set(&mut batch.buffer_capacity, overrides.batch.buffer_capacity);
    set(&mut batch.flush_timeout_ms, overrides.batch.flush_timeout_ms);

    let layer = &mut config.layer;
    set(&mut layer.min_level, overrides.layer.min_level);
    set(&mut layer.ignored_targets, overrides.layer.ignored_targets);
    set(&mut layer.include_target, overrides.layer.include_target);
    set(
        &mut layer.include_source_location,
        overrides.layer.include_source_location,
    );
    set(
        &mut layer.redact_secret_fields,
        overrides.layer.redact_secret_fields,
    );

    set(
        &mut config.diagnostics.stderr_json,
        overrides.diagnostics.stderr_json,
    );
    set(&mut config.diagnostics.filter, overrides.diagnostics.filter);
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_opt<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}
