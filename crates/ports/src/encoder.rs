//! Field encoder boundary contract.

use cloud_log_domain::{EntryHeader, Field, FieldSet, FieldValue};
use cloud_log_shared::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Accumulates typed fields for one log statement and turns the statement
/// into output when it completes.
///
/// Every typed `add_*` method funnels into [`EntryEncoder::add_field`].
pub trait EntryEncoder: Send {
    /// Record one field. Later writes to the same key win.
    fn add_field(&mut self, field: Field);

    /// Nest every later field of the current entry under `key`.
    fn open_namespace(&mut self, key: &str);

    /// Fields accumulated for the current entry.
    fn fields(&self) -> &FieldSet;

    /// Independent copy sharing the same downstream client.
    fn clone_box(&self) -> Box<dyn EntryEncoder>;

    /// Drop the accumulated fields and open namespaces.
    fn reset(&mut self);

    /// Complete the current entry.
    ///
    /// Returns the bytes destined for the write syncer. The accumulated
    /// fields are reset whatever the outcome.
    fn encode_entry(&mut self, header: EntryHeader) -> Result<Vec<u8>>;

    /// Record a boolean.
    fn add_bool(&mut self, key: &str, value: bool) {
        self.add_field(Field::new(key, value));
    }

    /// Record a signed integer.
    fn add_i64(&mut self, key: &str, value: i64) {
        self.add_field(Field::new(key, value));
    }

    /// Record an unsigned integer.
    fn add_u64(&mut self, key: &str, value: u64) {
        self.add_field(Field::new(key, value));
    }

    /// Record a signed 128-bit integer.
    fn add_i128(&mut self, key: &str, value: i128) {
        self.add_field(Field::new(key, value));
    }

    /// Record an unsigned 128-bit integer.
    fn add_u128(&mut self, key: &str, value: u128) {
        self.add_field(Field::new(key, value));
    }

    /// Record a float.
    fn add_f64(&mut self, key: &str, value: f64) {
        self.add_field(Field::new(key, value));
    }

    /// Record a string.
    fn add_str(&mut self, key: &str, value: &str) {
        self.add_field(Field::new(key, value));
    }

    /// Record raw bytes.
    fn add_bytes(&mut self, key: &str, value: &[u8]) {
        self.add_field(Field::new(key, value));
    }

    /// Record a duration.
    fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_field(Field::new(key, value));
    }

    /// Record a point in time.
    fn add_timestamp(&mut self, key: &str, value: DateTime<Utc>) {
        self.add_field(Field::new(key, value));
    }

    /// Record a list of values.
    fn add_array(&mut self, key: &str, values: Vec<FieldValue>) {
        self.add_field(Field::new(key, FieldValue::Array(values)));
    }

    /// Record a nested object.
    fn add_object(&mut self, key: &str, fields: FieldSet) {
        self.add_field(Field::new(key, FieldValue::Object(fields)));
    }
}

impl Clone for Box<dyn EntryEncoder> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
