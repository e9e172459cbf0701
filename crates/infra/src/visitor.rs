//! `tracing` field visitor feeding an [`EntryEncoder`].

use cloud_log_domain::LogLevel;
use cloud_log_ports::EntryEncoder;
use std::error::Error;
use std::fmt;
use tracing::field::{Field, Visit};

/// Field carrying the event message.
pub const MESSAGE_FIELD: &str = "message";

/// Field that overrides the event level, e.g. `log.level = "fatal"`.
pub const LEVEL_OVERRIDE_FIELD: &str = "log.level";

/// Routes every recorded value to the matching typed encoder method.
pub(crate) struct FieldVisitor<'a> {
    encoder: &'a mut dyn EntryEncoder,
    capture_event_fields: bool,
    message: Option<String>,
    level: Option<LogLevel>,
}

impl<'a> FieldVisitor<'a> {
    /// Visitor for span attributes; every field is recorded verbatim.
    pub(crate) fn for_span(encoder: &'a mut dyn EntryEncoder) -> Self {
        Self {
            encoder,
            capture_event_fields: false,
            message: None,
            level: None,
        }
    }

    /// Visitor for an event; the message and level override are held back.
    pub(crate) fn for_event(encoder: &'a mut dyn EntryEncoder) -> Self {
        Self {
            encoder,
            capture_event_fields: true,
            message: None,
            level: None,
        }
    }

    /// Message and level override seen while visiting.
    pub(crate) fn finish(self) -> (Option<String>, Option<LogLevel>) {
        (self.message, self.level)
    }

    fn capture_text(&mut self, name: &str, value: &str) -> bool {
        if !self.capture_event_fields {
            return false;
        }
        match name {
            MESSAGE_FIELD => {
                self.message = Some(value.to_owned());
                true
            },
            // An unknown level name is kept as an ordinary field.
            LEVEL_OVERRIDE_FIELD => match LogLevel::parse(value) {
                Ok(level) => {
                    self.level = Some(level);
                    true
                },
                Err(_) => false,
            },
            _ => false,
        }
    }

    fn capture_code(&mut self, name: &str, raw: i64) -> bool {
        if !self.capture_event_fields || name != LEVEL_OVERRIDE_FIELD {
            return false;
        }
        let level = i8::try_from(raw).ok().and_then(LogLevel::from_i8);
        self.level = level.or(self.level);
        level.is_some()
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.encoder.add_f64(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if !self.capture_code(field.name(), value) {
            self.encoder.add_i64(field.name(), value);
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.encoder.add_u64(field.name(), value);
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.encoder.add_i128(field.name(), value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.encoder.add_u128(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.encoder.add_bool(field.name(), value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if !self.capture_text(field.name(), value) {
            self.encoder.add_str(field.name(), value);
        }
    }

    fn record_bytes(&mut self, field: &Field, value: &[u8]) {
        self.encoder.add_bytes(field.name(), value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.record_str(field, &value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}
