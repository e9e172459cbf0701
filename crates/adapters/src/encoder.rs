//! Field encoder that submits completed statements to a remote log client.
//!
//! The encoder never produces bytes of its own. Each completed statement is
//! turned into a [`LogEntry`] and handed to the shared [`LogClientPort`];
//! `encode_entry` then returns an empty buffer for the write syncer.

use cloud_log_domain::{EntryHeader, Field, FieldSet, FieldValue, LogEntry};
use cloud_log_ports::{EntryEncoder, LogClientPort};
use cloud_log_shared::{ErrorCode, ErrorEnvelope, REDACTED, Result, is_secret_key};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by an encoder and everything derived from it.
#[derive(Debug, Default)]
pub struct EncoderStats {
    entries_submitted: AtomicU64,
    submit_failures: AtomicU64,
    dropped_fields: AtomicU64,
}

/// Point-in-time copy of [`EncoderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStatsSnapshot {
    /// Entries accepted by the client.
    pub entries_submitted: u64,
    /// Entries the client refused.
    pub submit_failures: u64,
    /// Fields dropped because they could not be represented.
    pub dropped_fields: u64,
}

impl EncoderStats {
    /// Read every counter.
    pub fn snapshot(&self) -> EncoderStatsSnapshot {
        EncoderStatsSnapshot {
            entries_submitted: self.entries_submitted.load(Ordering::Relaxed),
            submit_failures: self.submit_failures.load(Ordering::Relaxed),
            dropped_fields: self.dropped_fields.load(Ordering::Relaxed),
        }
    }

    fn record_submitted(&self) {
        self.entries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.submit_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped_field(&self) {
        self.dropped_fields.fetch_add(1, Ordering::Relaxed);
    }
}

/// [`EntryEncoder`] backed by a remote log client.
///
/// Holds two field sets: `context`, inherited by every entry and by derived
/// encoders, and `fields`, accumulated for the statement in progress and
/// cleared after each entry.
#[derive(Clone)]
pub struct CloudEncoder {
    client: Arc<dyn LogClientPort>,
    context: FieldSet,
    fields: FieldSet,
    namespaces: Vec<Box<str>>,
    stats: Arc<EncoderStats>,
    redact: bool,
}

impl CloudEncoder {
    /// Root encoder with no context.
    pub fn new(client: Arc<dyn LogClientPort>) -> Self {
        Self {
            client,
            context: FieldSet::new(),
            fields: FieldSet::new(),
            namespaces: Vec::new(),
            stats: Arc::new(EncoderStats::default()),
            redact: false,
        }
    }

    /// Replace values of secret-looking keys before submission.
    #[must_use]
    pub const fn with_redaction(mut self, enabled: bool) -> Self {
        self.redact = enabled;
        self
    }

    /// Derive a child encoder.
    ///
    /// The child's context is this encoder's context, then its accumulated
    /// fields, then `fields`. The client and stats are shared.
    #[must_use]
    pub fn with_context(&self, fields: FieldSet) -> Self {
        let mut context = self.context.clone();
        context.merge_deep(self.fields.clone());
        context.merge_deep(fields);
        Self {
            client: Arc::clone(&self.client),
            context,
            fields: FieldSet::new(),
            namespaces: Vec::new(),
            stats: Arc::clone(&self.stats),
            redact: self.redact,
        }
    }

    /// Add fields to this encoder's own context.
    pub fn extend_context(&mut self, fields: FieldSet) {
        self.context.merge_deep(fields);
    }

    /// Move the accumulated fields into the context.
    ///
    /// Used when the fields describe a scope (a span) rather than one entry.
    pub fn promote_fields(&mut self) {
        let fields = std::mem::take(&mut self.fields);
        self.namespaces.clear();
        self.context.merge_deep(fields);
    }

    /// Fields inherited by every entry.
    pub const fn context(&self) -> &FieldSet {
        &self.context
    }

    /// Counters shared with derived encoders.
    pub fn stats(&self) -> Arc<EncoderStats> {
        Arc::clone(&self.stats)
    }

    /// Record any serializable value.
    ///
    /// A value that fails to serialize is dropped: the call returns the
    /// error, the `dropped_fields` counter increments and a warning is
    /// emitted.
    pub fn add_reflected<T>(&mut self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(json) => {
                self.add_field(Field::new(key, FieldValue::Json(json)));
                Ok(())
            },
            Err(error) => {
                self.stats.record_dropped_field();
                tracing::warn!(
                    target: "cloud_log::encoder",
                    key,
                    error = %error,
                    "dropping field that failed to serialize"
                );
                Err(ErrorEnvelope::expected(
                    ErrorCode::new("encoder", "unserializable_field"),
                    format!("field failed to serialize: {error}"),
                )
                .with_metadata("key", key))
            },
        }
    }

    fn take_payload(&mut self) -> FieldSet {
        let mut payload = self.context.clone();
        payload.merge_deep(std::mem::take(&mut self.fields));
        self.namespaces.clear();
        if self.redact {
            redact_fields(&mut payload);
        }
        payload
    }
}

impl fmt::Debug for CloudEncoder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CloudEncoder")
            .field("context", &self.context)
            .field("fields", &self.fields)
            .field("namespaces", &self.namespaces)
            .field("redact", &self.redact)
            .finish_non_exhaustive()
    }
}

impl EntryEncoder for CloudEncoder {
    fn add_field(&mut self, field: Field) {
        if self.namespaces.is_empty() {
            self.fields.insert(field.key, field.value);
        } else {
            self.fields
                .insert_nested(&self.namespaces, field.key, field.value);
        }
    }

    fn open_namespace(&mut self, key: &str) {
        self.namespaces.push(key.into());
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }

    fn clone_box(&self) -> Box<dyn EntryEncoder> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.fields.clear();
        self.namespaces.clear();
    }

    fn encode_entry(&mut self, header: EntryHeader) -> Result<Vec<u8>> {
        let payload = self.take_payload();
        let entry = LogEntry::from_header(header, payload);

        match self.client.log(entry) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(Vec::new())
            },
            Err(error) => {
                self.stats.record_failure();
                Err(error)
            },
        }
    }
}

fn redact_fields(fields: &mut FieldSet) {
    for (key, value) in fields.iter_mut() {
        if is_secret_key(key) {
            *value = FieldValue::from(REDACTED);
        } else {
            redact_value(value);
        }
    }
}

fn redact_value(value: &mut FieldValue) {
    match value {
        FieldValue::Object(nested) => redact_fields(nested),
        FieldValue::Array(items) => items.iter_mut().for_each(redact_value),
        FieldValue::Json(json) => redact_json(json),
        _ => {},
    }
}

fn redact_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map.iter_mut() {
                if is_secret_key(key) {
                    *nested = serde_json::Value::String(REDACTED.to_string());
                } else {
                    redact_json(nested);
                }
            }
        },
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {},
    }
}
