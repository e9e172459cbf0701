//! Source log levels.

use crate::severity::Severity;
use cloud_log_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Log level reported by the owning logging library.
///
/// Ordered from least to most severe. The raw codes match the classic
/// structured-logger numbering, where `Info` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum LogLevel {
    /// Fine-grained diagnostics.
    Trace = -2,
    /// Debugging output.
    Debug = -1,
    /// Routine information.
    Info = 0,
    /// Something unexpected, not yet an error.
    Warn = 1,
    /// Failed operation.
    Error = 2,
    /// Error that panics in development builds.
    DPanic = 3,
    /// Error followed by a panic.
    Panic = 4,
    /// Error followed by process exit.
    Fatal = 5,
}

impl LogLevel {
    /// Every level, least severe first.
    pub const ALL: [Self; 8] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::DPanic,
        Self::Panic,
        Self::Fatal,
    ];

    /// Raw numeric code.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// Resolve a raw numeric code. Unknown codes return `None`.
    #[must_use]
    pub const fn from_i8(raw: i8) -> Option<Self> {
        match raw {
            -2 => Some(Self::Trace),
            -1 => Some(Self::Debug),
            0 => Some(Self::Info),
            1 => Some(Self::Warn),
            2 => Some(Self::Error),
            3 => Some(Self::DPanic),
            4 => Some(Self::Panic),
            5 => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::DPanic => "dpanic",
            Self::Panic => "panic",
            Self::Fatal => "fatal",
        }
    }

    /// Parse a level name, case-insensitively.
    ///
    /// Severity names of the destination service are accepted as aliases
    /// for the level they map from.
    pub fn parse(input: &str) -> Result<Self, LevelParseError> {
        let normalized = input.trim().to_ascii_lowercase();
        let level = match normalized.as_str() {
            "trace" | "default" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "dpanic" | "critical" => Self::DPanic,
            "panic" | "alert" => Self::Panic,
            "fatal" | "emergency" => Self::Fatal,
            _ => {
                return Err(LevelParseError {
                    input: input.to_owned(),
                });
            },
        };
        Ok(level)
    }

    /// Destination severity for this level.
    #[must_use]
    pub const fn severity(self) -> Severity {
        Severity::from_level(self)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LevelParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Unknown level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelParseError {
    /// Input that failed to parse.
    pub input: String,
}

impl fmt::Display for LevelParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "unknown log level `{}` (expected trace, debug, info, warn, error, dpanic, panic, fatal)",
            self.input
        )
    }
}

impl std::error::Error for LevelParseError {}

impl From<LevelParseError> for ErrorEnvelope {
    fn from(error: LevelParseError) -> Self {
        let input = error.input.clone();
        Self::expected(
            ErrorCode::new("domain", "invalid_log_level"),
            error.to_string(),
        )
        .with_metadata("input", input)
    }
}
