//! # cloud-log-adapters
//!
//! Adapter implementations for ports: the Cloud Logging field encoder, the
//! flush-forwarding write syncer, and the HTTP client behind them.
//! This crate depends on `ports`, `config`, `domain`, and `shared`.

/// Google Cloud Logging HTTP client.
pub mod cloud_logging;
/// Field encoder submitting entries to a log client.
pub mod encoder;
pub mod log_sink;
/// Write syncer forwarding flushes to a log client.
pub mod write_syncer;

pub use cloud_logging::{
    CloudLoggingClient, CloudLoggingClientOptions, MonitoredResource, is_delivery_thread,
};
pub use encoder::{CloudEncoder, EncoderStats, EncoderStatsSnapshot};
pub use log_sink::{LogSink, StderrLogSink};
pub use write_syncer::CloudWriteSyncer;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
