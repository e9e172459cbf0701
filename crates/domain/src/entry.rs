//! Log entries handed to the remote client.

use crate::field_set::FieldSet;
use crate::level::LogLevel;
use crate::severity::Severity;
use chrono::{DateTime, Utc};

/// Payload key that carries the log message.
pub const MESSAGE_KEY: &str = "msg";

/// Where a log statement was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file path.
    pub file: Box<str>,
    /// Line within the file.
    pub line: Option<u32>,
    /// Function or module path.
    pub function: Option<Box<str>>,
}

/// What the logging library supplies when a statement completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Source level.
    pub level: LogLevel,
    /// Message text.
    pub message: Box<str>,
    /// When the statement was issued.
    pub timestamp: DateTime<Utc>,
    /// Call site, when known.
    pub source_location: Option<SourceLocation>,
}

impl EntryHeader {
    /// Header stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<Box<str>>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            source_location: None,
        }
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a call site.
    #[must_use]
    pub fn with_source_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }
}

/// One structured entry as submitted to the ingestion service.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the statement was issued.
    pub timestamp: DateTime<Utc>,
    /// Destination severity.
    pub severity: Severity,
    /// Fields plus the message under [`MESSAGE_KEY`].
    pub payload: FieldSet,
    /// Call site, when known.
    pub source_location: Option<SourceLocation>,
}

impl LogEntry {
    /// Assemble an entry from a header and the fields accumulated for it.
    ///
    /// The message is stored under [`MESSAGE_KEY`] and replaces any field of
    /// the same name.
    #[must_use]
    pub fn from_header(header: EntryHeader, mut payload: FieldSet) -> Self {
        payload.insert(MESSAGE_KEY, header.message);
        Self {
            timestamp: header.timestamp,
            severity: header.level.severity(),
            payload,
            source_location: header.source_location,
        }
    }

    /// Message text, when present.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.payload
            .get(MESSAGE_KEY)
            .and_then(crate::field::FieldValue::as_str)
    }
}
