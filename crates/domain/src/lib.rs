//! # cloud-log-domain
//!
//! Domain model for shipping structured log statements to a cloud
//! log-ingestion service.
//!
//! - **Levels** - `LogLevel`, the eight source levels
//! - **Severities** - `Severity`, the destination enum and the fixed mapping
//! - **Fields** - `FieldValue`, `Field`, and the ordered `FieldSet`
//! - **Entries** - `EntryHeader`, `LogEntry`, `SourceLocation`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use cloud_log_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod entry;
pub mod field;
pub mod field_set;
pub mod level;
pub mod severity;

pub use entry::{EntryHeader, LogEntry, MESSAGE_KEY, SourceLocation};
pub use field::{Field, FieldValue, format_duration, format_timestamp};
pub use field_set::FieldSet;
pub use level::{LevelParseError, LogLevel};
pub use severity::Severity;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================
