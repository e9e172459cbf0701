//! # cloud-log
//!
//! Facade API for applications shipping `tracing` events to Google Cloud
//! Logging. This crate depends on `infra`, `adapters`, and `config`.
//!
//! ```no_run
//! fn main() -> Result<(), cloud_log::InfraError> {
//!     let _guard = cloud_log::init_from_std_env(None)?;
//!     tracing::info!(order_id = 42, "order placed");
//!     Ok(())
//! }
//! ```

use std::path::Path;

pub use cloud_log_adapters::{
    CloudEncoder, CloudLoggingClient, CloudLoggingClientOptions, CloudWriteSyncer, EncoderStats,
    EncoderStatsSnapshot, LogSink, MonitoredResource, StderrLogSink,
};
pub use cloud_log_config::{
    CloudLogConfig, CloudLogEnv, DeliveryMode, ValidatedCloudLogConfig,
    load_cloud_log_config_from_path,
};
pub use cloud_log_domain::{
    EntryHeader, Field, FieldSet, FieldValue, LogEntry, LogLevel, Severity, SourceLocation,
};
pub use cloud_log_infra::{
    CloudLogging, CloudLoggingLayer, FlushGuard, InfraError, InfraResult, build_cloud_logging,
    build_with_client,
};
pub use cloud_log_ports::{EntryEncoder, LogClientPort, WriteSyncer};
pub use cloud_log_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Install the global subscriber shipping events to Cloud Logging.
///
/// Keep the returned guard alive; dropping it flushes pending entries.
pub fn try_init(config: &ValidatedCloudLogConfig, env: &CloudLogEnv) -> InfraResult<FlushGuard> {
    cloud_log_infra::init_global(config, env)
}

/// Load the config from `config_path` (if any) and the process environment,
/// then install the global subscriber.
pub fn init_from_std_env(config_path: Option<&Path>) -> InfraResult<FlushGuard> {
    let env = CloudLogEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    let config = load_cloud_log_config_from_path(config_path, None, &env)?;
    try_init(&config, &env)
}
