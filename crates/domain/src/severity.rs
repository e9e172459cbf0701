//! Destination severities and the level mapping table.

use crate::level::LogLevel;
use serde::{Serialize, Serializer};
use std::fmt;

/// Severity enum of the cloud log-ingestion service.
///
/// Numeric codes follow the service's `LogSeverity` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// No assigned severity.
    #[default]
    Default,
    /// Debug or trace information.
    Debug,
    /// Routine information.
    Info,
    /// Normal but significant events.
    Notice,
    /// Events that might cause problems.
    Warning,
    /// Events likely to cause problems.
    Error,
    /// Events that cause more severe problems or outages.
    Critical,
    /// A person must take action immediately.
    Alert,
    /// One or more systems are unusable.
    Emergency,
}

impl Severity {
    /// Map a source level. Total and one-to-one.
    #[must_use]
    pub const fn from_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Default,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warning,
            LogLevel::Error => Self::Error,
            LogLevel::DPanic => Self::Critical,
            LogLevel::Panic => Self::Alert,
            LogLevel::Fatal => Self::Emergency,
        }
    }

    /// Map a raw level code. Codes outside the known range map to
    /// [`Severity::Default`].
    #[must_use]
    pub const fn from_raw_level(raw: i8) -> Self {
        match LogLevel::from_i8(raw) {
            Some(level) => Self::from_level(level),
            None => Self::Default,
        }
    }

    /// Numeric severity code used by the service.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::Debug => 100,
            Self::Info => 200,
            Self::Notice => 300,
            Self::Warning => 400,
            Self::Error => 500,
            Self::Critical => 600,
            Self::Alert => 700,
            Self::Emergency => 800,
        }
    }

    /// Wire name (upper case).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Alert => "ALERT",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl From<LogLevel> for Severity {
    fn from(level: LogLevel) -> Self {
        Self::from_level(level)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn mapping_table_matches_service_levels() {
        let table = [
            (LogLevel::Trace, Severity::Default),
            (LogLevel::Debug, Severity::Debug),
            (LogLevel::Info, Severity::Info),
            (LogLevel::Warn, Severity::Warning),
            (LogLevel::Error, Severity::Error),
            (LogLevel::DPanic, Severity::Critical),
            (LogLevel::Panic, Severity::Alert),
            (LogLevel::Fatal, Severity::Emergency),
        ];
        for (level, severity) in table {
            assert_eq!(Severity::from_level(level), severity, "{level}");
            assert_eq!(level.severity(), severity);
        }
    }

    #[test]
    fn mapping_is_one_to_one() {
        let severities: BTreeSet<Severity> =
            LogLevel::ALL.iter().map(|level| level.severity()).collect();
        assert_eq!(severities.len(), LogLevel::ALL.len());
        assert!(!severities.contains(&Severity::Notice));
    }

    #[test]
    fn mapping_preserves_order() {
        assert!(
            LogLevel::ALL
                .windows(2)
                .all(|pair| pair[0].severity().code() < pair[1].severity().code())
        );
    }

    #[test]
    fn unknown_raw_levels_fall_back_to_default() {
        assert_eq!(Severity::from_raw_level(42), Severity::Default);
        assert_eq!(Severity::from_raw_level(i8::MIN), Severity::Default);
        assert_eq!(Severity::from_raw_level(2), Severity::Error);
    }

    #[test]
    fn serializes_upper_case_name() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Severity::Warning)?, "\"WARNING\"");
        assert_eq!(Severity::Emergency.code(), 800);
        Ok(())
    }

    proptest! {
        #[test]
        fn every_raw_level_maps_without_failing(raw in any::<i8>()) {
            let severity = Severity::from_raw_level(raw);
            match LogLevel::from_i8(raw) {
                Some(level) => prop_assert_eq!(severity, level.severity()),
                None => prop_assert_eq!(severity, Severity::Default),
            }
        }
    }
}
