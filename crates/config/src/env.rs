//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - deterministic (CSV lists normalize to sorted/deduped values)
//! - safe (secret values are redacted in error metadata)

use crate::schema::{CloudLogConfig, DeliveryMode, ValidatedCloudLogConfig};
use cloud_log_domain::LogLevel;
use cloud_log_shared::{ErrorCode, ErrorEnvelope, SecretString, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Env var: project id.
pub const ENV_PROJECT_ID: &str = "CLOUD_LOG_PROJECT_ID";
/// Env var: project id (alias used by Google client libraries).
pub const ENV_PROJECT_ID_ALIAS: &str = "GOOGLE_CLOUD_PROJECT";
/// Env var: log id.
pub const ENV_LOG_ID: &str = "CLOUD_LOG_LOG_ID";
/// Env var: ingestion API base URL.
pub const ENV_BASE_URL: &str = "CLOUD_LOG_BASE_URL";
/// Env var: OAuth2 access token (secret).
pub const ENV_ACCESS_TOKEN: &str = "CLOUD_LOG_ACCESS_TOKEN";
/// Env var: connect timeout in milliseconds.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CLOUD_LOG_CONNECT_TIMEOUT_MS";
/// Env var: request timeout in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "CLOUD_LOG_REQUEST_TIMEOUT_MS";
/// Env var: delivery mode (`buffered` or `synchronous`).
pub const ENV_DELIVERY: &str = "CLOUD_LOG_DELIVERY";
/// Env var: dry-run write at construction.
pub const ENV_PING_ON_CONNECT: &str = "CLOUD_LOG_PING_ON_CONNECT";
/// Env var: entries per write request.
pub const ENV_BATCH_MAX_ENTRIES: &str = "CLOUD_LOG_BATCH_MAX_ENTRIES";
/// Env var: batch flush interval in milliseconds.
pub const ENV_FLUSH_INTERVAL_MS: &str = "CLOUD_LOG_FLUSH_INTERVAL_MS";
/// Env var: buffered entry capacity.
pub const ENV_BUFFER_CAPACITY: &str = "CLOUD_LOG_BUFFER_CAPACITY";
/// Env var: blocking flush timeout in milliseconds.
pub const ENV_FLUSH_TIMEOUT_MS: &str = "CLOUD_LOG_FLUSH_TIMEOUT_MS";
/// Env var: least severe forwarded level.
pub const ENV_MIN_LEVEL: &str = "CLOUD_LOG_MIN_LEVEL";
/// Env var: CSV of ignored target prefixes.
pub const ENV_IGNORED_TARGETS: &str = "CLOUD_LOG_IGNORED_TARGETS";
/// Env var: mirror events to stderr as JSON.
pub const ENV_STDERR_JSON: &str = "CLOUD_LOG_STDERR_JSON";
/// Env var: `EnvFilter` directive.
pub const ENV_FILTER: &str = "CLOUD_LOG_FILTER";

const ALL_ENV_VARS: [&str; 17] = [
    ENV_PROJECT_ID,
    ENV_PROJECT_ID_ALIAS,
    ENV_LOG_ID,
    ENV_BASE_URL,
    ENV_ACCESS_TOKEN,
    ENV_CONNECT_TIMEOUT_MS,
    ENV_REQUEST_TIMEOUT_MS,
    ENV_DELIVERY,
    ENV_PING_ON_CONNECT,
    ENV_BATCH_MAX_ENTRIES,
    ENV_FLUSH_INTERVAL_MS,
    ENV_BUFFER_CAPACITY,
    ENV_FLUSH_TIMEOUT_MS,
    ENV_MIN_LEVEL,
    ENV_IGNORED_TARGETS,
    ENV_STDERR_JSON,
    ENV_FILTER,
];

const IGNORED_TARGETS_CSV_MAX: usize = 128;

/// Parsed environment overrides.
///
/// The access token lives only here. It never enters [`CloudLogConfig`], so
/// serialized configs cannot leak it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudLogEnv {
    /// Project id.
    pub project_id: Option<Box<str>>,
    /// Log id.
    pub log_id: Option<Box<str>>,
    /// Ingestion API base URL.
    pub base_url: Option<Box<str>>,
    /// OAuth2 access token.
    pub access_token: Option<SecretString>,
    /// Connect timeout (ms).
    pub connect_timeout_ms: Option<u64>,
    /// Request timeout (ms).
    pub request_timeout_ms: Option<u64>,
    /// Delivery mode.
    pub delivery: Option<DeliveryMode>,
    /// Dry-run write at construction.
    pub ping_on_connect: Option<bool>,
    /// Entries per write request.
    pub batch_max_entries: Option<u32>,
    /// Flush interval (ms).
    pub flush_interval_ms: Option<u64>,
    /// Buffer capacity.
    pub buffer_capacity: Option<u32>,
    /// Flush timeout (ms).
    pub flush_timeout_ms: Option<u64>,
    /// Least severe forwarded level.
    pub min_level: Option<LogLevel>,
    /// Ignored target prefixes.
    pub ignored_targets: Option<Vec<Box<str>>>,
    /// Mirror events to stderr.
    pub stderr_json: Option<bool>,
    /// `EnvFilter` directive.
    pub filter: Option<Box<str>>,
}

impl CloudLogEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            project_id: parse_optional_trimmed_string_any(
                map,
                &[ENV_PROJECT_ID, ENV_PROJECT_ID_ALIAS],
            )?,
            log_id: parse_optional_trimmed_string(map, ENV_LOG_ID)?,
            base_url: parse_optional_url_string(map, ENV_BASE_URL)?,
            access_token: parse_optional_secret(map, ENV_ACCESS_TOKEN)?,
            connect_timeout_ms: parse_optional_u64(map, ENV_CONNECT_TIMEOUT_MS)?,
            request_timeout_ms: parse_optional_u64(map, ENV_REQUEST_TIMEOUT_MS)?,
            delivery: parse_optional_delivery(map, ENV_DELIVERY)?,
            ping_on_connect: parse_optional_bool(map, ENV_PING_ON_CONNECT)?,
            batch_max_entries: parse_optional_u32(map, ENV_BATCH_MAX_ENTRIES)?,
            flush_interval_ms: parse_optional_u64(map, ENV_FLUSH_INTERVAL_MS)?,
            buffer_capacity: parse_optional_u32(map, ENV_BUFFER_CAPACITY)?,
            flush_timeout_ms: parse_optional_u64(map, ENV_FLUSH_TIMEOUT_MS)?,
            min_level: parse_optional_level(map, ENV_MIN_LEVEL)?,
            ignored_targets: parse_optional_csv(map, ENV_IGNORED_TARGETS)?,
            stderr_json: parse_optional_bool(map, ENV_STDERR_JSON)?,
            filter: parse_optional_trimmed_string(map, ENV_FILTER)?,
        })
    }

    /// Parse env overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: CloudLogConfig,
    env: &CloudLogEnv,
) -> Result<ValidatedCloudLogConfig, ErrorEnvelope> {
    let mut config = base;
    apply_client_env_overrides(&mut config, env);
    apply_batch_env_overrides(&mut config, env);
    apply_layer_env_overrides(&mut config, env);

    config.validate_and_normalize().map_err(Into::into)
}

fn apply_client_env_overrides(config: &mut CloudLogConfig, env: &CloudLogEnv) {
    let client = &mut config.client;
    set_opt_string(&mut client.project_id, env.project_id.as_deref());
    set_opt_string(&mut client.log_id, env.log_id.as_deref());
    if let Some(base_url) = env.base_url.as_deref() {
        base_url.clone_into(&mut client.base_url);
    }
    set_value(&mut client.connect_timeout_ms, env.connect_timeout_ms);
    set_value(&mut client.request_timeout_ms, env.request_timeout_ms);
    set_value(&mut client.delivery, env.delivery);
    set_value(&mut client.ping_on_connect, env.ping_on_connect);
}

const fn apply_batch_env_overrides(config: &mut CloudLogConfig, env: &CloudLogEnv) {
    let batch = &mut config.batch;
    if let Some(value) = env.batch_max_entries {
        batch.max_entries = value;
    }
    if let Some(value) = env.flush_interval_ms {
        batch.flush_interval_ms = value;
    }
    if let Some(value) = env.buffer_capacity {
        batch.buffer_capacity = value;
    }
    if let Some(value) = env.flush_timeout_ms {
        batch.flush_timeout_ms = value;
    }
}

fn apply_layer_env_overrides(config: &mut CloudLogConfig, env: &CloudLogEnv) {
    set_value(&mut config.layer.min_level, env.min_level);
    if let Some(targets) = env.ignored_targets.as_ref() {
        config.layer.ignored_targets = targets.iter().map(ToString::to_string).collect();
    }
    set_value(&mut config.diagnostics.stderr_json, env.stderr_json);
    if let Some(filter) = env.filter.as_deref() {
        filter.clone_into(&mut config.diagnostics.filter);
    }
}

fn set_value<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_opt_string(field: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value {
        *field = Some(value.to_owned());
    }
}

/// Env parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// Variable is set but empty.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Secret variable is set but empty.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Value is not a boolean.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// Value is not an integer.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// Value is not an http(s) URL.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// Value is not one of the accepted names.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// CSV list exceeds a safety limit.
    CsvTooLarge {
        /// Env var name.
        var: &'static str,
        /// Number of parsed items.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
            Self::CsvTooLarge { .. } => ErrorCode::new("config", "invalid_env_csv"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
            Self::CsvTooLarge { var, len, max } => {
                write!(formatter, "{var} is too large ({len} items, max {max})")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_if_secret(var, &value));
            },
            EnvParseError::CsvTooLarge { var, len, max } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_trimmed_string_any(
    map: &BTreeMap<String, String>,
    vars: &[&'static str],
) -> Result<Option<Box<str>>, EnvParseError> {
    for var in vars {
        if map.contains_key(*var) {
            return parse_optional_trimmed_string(map, var);
        }
    }
    Ok(None)
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed.to_owned())))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_delivery(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<DeliveryMode>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    DeliveryMode::parse(&raw)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn parse_optional_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogLevel>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    LogLevel::parse(&raw)
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    let parsed = Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(EnvParseError::InvalidUrl {
            var,
            value: raw.clone(),
        });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_csv(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<Box<str>>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let mut items: Vec<Box<str>> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Into::into)
        .collect();
    items.sort();
    items.dedup();

    if items.len() > IGNORED_TARGETS_CSV_MAX {
        return Err(EnvParseError::CsvTooLarge {
            var,
            len: items.len(),
            max: IGNORED_TARGETS_CSV_MAX,
        });
    }
    Ok(Some(items))
}
