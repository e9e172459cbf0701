//! Insertion-ordered field collection.

use crate::field::{Field, FieldValue};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Accumulated fields for one log statement or one context.
///
/// Keys are unique. Inserting an existing key replaces its value but keeps
/// the position of the first insertion. Log statements carry a handful of
/// fields, so lookups are linear scans over a `Vec`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    entries: Vec<(Box<str>, FieldValue)>,
}

impl FieldSet {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Empty set with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_ref() == key)
            .map(|(_, value)| value)
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing.as_ref() == key)
            .map(|(_, value)| value)
    }

    /// True when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<Box<str>>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Insert a prebuilt field.
    pub fn insert_field(&mut self, field: Field) -> Option<FieldValue> {
        self.insert(field.key, field.value)
    }

    /// Insert under a chain of nested objects.
    ///
    /// Missing objects along `path` are created. A non-object value already
    /// sitting at a path segment is replaced by an object.
    pub fn insert_nested(
        &mut self,
        path: &[Box<str>],
        key: impl Into<Box<str>>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        let Some((head, rest)) = path.split_first() else {
            return self.insert(key, value);
        };

        if !matches!(self.get(head), Some(FieldValue::Object(_))) {
            self.insert(head.clone(), FieldValue::Object(Self::new()));
        }
        match self.get_mut(head) {
            Some(FieldValue::Object(nested)) => nested.insert_nested(rest, key, value),
            _ => None,
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let index = self
            .entries
            .iter()
            .position(|(existing, _)| existing.as_ref() == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Copy every field of `other` into this set; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Move every field of `other` into this set; `other` wins on conflicts.
    pub fn merge_owned(&mut self, other: Self) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    /// Remove every field, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(key, value)| (key.as_ref(), value))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_ref())
    }

    /// Iterate fields mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (&str, &mut FieldValue)> {
        self.entries
            .iter_mut()
            .map(|(key, value)| (&**key, value))
    }

    /// Move every field of `other` into this set, merging nested objects
    /// key by key instead of replacing them.
    pub fn merge_deep(&mut self, other: Self) {
        for (key, value) in other.entries {
            let incoming = match value {
                FieldValue::Object(incoming) => incoming,
                other => {
                    self.insert(key, other);
                    continue;
                },
            };
            if let Some(FieldValue::Object(existing)) = self.get_mut(&key) {
                existing.merge_deep(incoming);
                continue;
            }
            self.insert(key, FieldValue::Object(incoming));
        }
    }

    /// Convert into a JSON object map (insertion order is not preserved by
    /// `serde_json::Map` without its `preserve_order` feature).
    #[must_use]
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_json()))
            .collect()
    }

    /// Convert into a JSON object value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.to_json_map())
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.as_ref(), value)?;
        }
        map.end()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldSet
where
    K: Into<Box<str>>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K, V> Extend<(K, V)> for FieldSet
where
    K: Into<Box<str>>,
    V: Into<FieldValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for FieldSet {
    type Item = (Box<str>, FieldValue);
    type IntoIter = std::vec::IntoIter<(Box<str>, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
