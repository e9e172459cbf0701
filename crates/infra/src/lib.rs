//! # cloud-log-infra
//!
//! `tracing` integration and runtime composition.
//! This crate depends on `adapters`, `config`, `ports`, and `shared`.

/// Client, layer and guard construction.
pub mod bootstrap;
/// `tracing` layer driving the encoder.
pub mod layer;
/// `tracing` field visitor.
mod visitor;

pub use bootstrap::{
    CloudLogging, FlushGuard, build_cloud_logging, build_with_client, env_filter, init_global,
};
pub use layer::{CloudLoggingLayer, TARGET_KEY, level_from_tracing};
pub use visitor::{LEVEL_OVERRIDE_FIELD, MESSAGE_FIELD};

/// Infra-level error type (shared error envelope).
pub type InfraError = cloud_log_shared::ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
