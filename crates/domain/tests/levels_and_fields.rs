//! Integration coverage for level mapping, field sets, and entry assembly.

use chrono::DateTime;
use cloud_log_domain::{
    EntryHeader, FieldSet, FieldValue, LevelParseError, LogEntry, LogLevel, Severity,
    SourceLocation,
};
use cloud_log_shared::ErrorEnvelope;
use serde_json::json;
use std::time::Duration;

#[test]
fn level_errors_map_into_error_envelopes() -> Result<(), LevelParseError> {
    let Err(error) = LogLevel::parse("verbose") else {
        return Err(LevelParseError {
            input: "verbose".to_string(),
        });
    };

    let envelope: ErrorEnvelope = error.into();
    assert_eq!(envelope.code.namespace(), "domain");
    assert_eq!(envelope.code.code(), "invalid_log_level");
    assert_eq!(
        envelope.metadata.get("input"),
        Some(&"verbose".to_string())
    );
    Ok(())
}

#[test]
fn config_style_level_names_deserialize() -> Result<(), serde_json::Error> {
    let level: LogLevel = serde_json::from_value(json!("WARNING"))?;
    assert_eq!(level, LogLevel::Warn);
    assert_eq!(serde_json::to_value(LogLevel::DPanic)?, json!("dpanic"));

    let rejected = serde_json::from_value::<LogLevel>(json!("noisy"));
    assert!(rejected.is_err());
    Ok(())
}

#[test]
fn every_level_has_exactly_one_severity() -> Result<(), LevelParseError> {
    for level in LogLevel::ALL {
        let parsed = LogLevel::parse(level.as_str())?;
        assert_eq!(parsed.severity(), Severity::from_raw_level(level.as_i8()));
    }
    Ok(())
}

#[test]
fn accumulated_fields_reach_the_payload_unchanged() {
    let at = DateTime::from_timestamp(1_700_000_000, 250_000_000);
    let mut fields = FieldSet::new();
    fields.insert("flag", true);
    fields.insert("count", -7_i64);
    fields.insert("size", 42_u64);
    fields.insert("ratio", 0.25_f64);
    fields.insert("name", "svc");
    fields.insert("raw", vec![0_u8, 1, 2]);
    fields.insert("elapsed", Duration::from_micros(1_500));
    fields.insert("at", at);

    let expected = fields.clone();
    let entry = LogEntry::from_header(EntryHeader::new(LogLevel::Info, "ok"), fields);

    for (key, value) in expected.iter() {
        assert_eq!(entry.payload.get(key), Some(value), "{key}");
    }
    assert_eq!(
        entry.payload.get("elapsed").map(FieldValue::to_json),
        Some(json!("0.0015s"))
    );
    assert_eq!(
        entry.payload.get("at").map(FieldValue::to_json),
        Some(json!("2023-11-14T22:13:20.250Z"))
    );
}

#[test]
fn header_builders_carry_through() {
    let location = SourceLocation {
        file: "src/main.rs".into(),
        line: Some(12),
        function: Some("app::main".into()),
    };
    let at = DateTime::from_timestamp(1, 0).unwrap_or_default();
    let header = EntryHeader::new(LogLevel::Fatal, "bye")
        .with_timestamp(at)
        .with_source_location(location.clone());
    let entry = LogEntry::from_header(header, FieldSet::new());

    assert_eq!(entry.timestamp, at);
    assert_eq!(entry.severity, Severity::Emergency);
    assert_eq!(entry.source_location, Some(location));
}
