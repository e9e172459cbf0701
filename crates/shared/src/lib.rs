//! # cloud-log-shared
//!
//! Shared result types, error envelopes, and redaction helpers for the
//! cloud-log workspace.
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **One error type** - Every crate reports failures as [`ErrorEnvelope`]
//! 3. **Serde-compatible** - Error types serialize for structured diagnostics

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod redaction;
pub mod result;

pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, envelope_from_io,
    into_io_error,
};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};
pub use result::Result;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
