//! Typed field values.

use crate::field_set::FieldSet;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::time::{Duration, SystemTime};

/// One value attached to a log statement.
///
/// A single tagged type so encoders dispatch through one method instead of
/// one method per primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer up to 64 bits.
    I64(i64),
    /// Unsigned integer up to 64 bits.
    U64(u64),
    /// Signed 128-bit integer.
    I128(i128),
    /// Unsigned 128-bit integer.
    U128(u128),
    /// Floating point number.
    F64(f64),
    /// UTF-8 string.
    Str(Box<str>),
    /// Raw bytes, base64 encoded on the wire.
    Bytes(Vec<u8>),
    /// Elapsed time.
    Duration(Duration),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Ordered list of values.
    Array(Vec<FieldValue>),
    /// Nested object.
    Object(FieldSet),
    /// Arbitrary value captured through serde.
    Json(serde_json::Value),
}

impl FieldValue {
    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::I128(_) => "i128",
            Self::U128(_) => "u128",
            Self::F64(_) => "f64",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Duration(_) => "duration",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Json(_) => "json",
        }
    }

    /// Borrow the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a JSON value.
    ///
    /// Values JSON cannot carry losslessly become strings: 128-bit integers
    /// outside the 64-bit range, non-finite floats, bytes (base64),
    /// durations (`"1.5s"`) and timestamps (RFC 3339).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::I64(value) => Value::from(*value),
            Self::U64(value) => Value::from(*value),
            Self::I128(value) => i64::try_from(*value)
                .map_or_else(|_| Value::String(value.to_string()), Value::from),
            Self::U128(value) => u64::try_from(*value)
                .map_or_else(|_| Value::String(value.to_string()), Value::from),
            Self::F64(value) => serde_json::Number::from_f64(*value)
                .map_or_else(|| Value::String(non_finite_name(*value).to_owned()), Value::Number),
            Self::Str(value) => Value::String(value.to_string()),
            Self::Bytes(value) => Value::String(STANDARD.encode(value)),
            Self::Duration(value) => Value::String(format_duration(*value)),
            Self::Timestamp(value) => Value::String(format_timestamp(value)),
            Self::Array(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(fields.to_json_map()),
            Self::Json(value) => value.clone(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::I64(value) => serializer.serialize_i64(*value),
            Self::U64(value) => serializer.serialize_u64(*value),
            Self::F64(value) if value.is_finite() => serializer.serialize_f64(*value),
            Self::Str(value) => serializer.serialize_str(value),
            Self::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            },
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            },
            Self::Json(value) => value.serialize(serializer),
            Self::I128(_)
            | Self::U128(_)
            | Self::F64(_)
            | Self::Bytes(_)
            | Self::Duration(_)
            | Self::Timestamp(_) => self.to_json().serialize(serializer),
        }
    }
}

const fn non_finite_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

/// Format a duration the way the service's JSON mapping expects: seconds
/// with an optional fraction and an `s` suffix.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        return format!("{seconds}s");
    }
    let fraction = format!("{nanos:09}");
    format!("{seconds}.{}s", fraction.trim_end_matches('0'))
}

/// Format a timestamp as RFC 3339 in UTC with nanosecond precision when present.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::I64(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::U64(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<isize> for FieldValue {
    fn from(value: isize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::I128(value as i128), Self::I64)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        u64::try_from(value).map_or_else(|_| Self::U128(value as u128), Self::U64)
    }
}

impl From<i128> for FieldValue {
    fn from(value: i128) -> Self {
        Self::I128(value)
    }
}

impl From<u128> for FieldValue {
    fn from(value: u128) -> Self {
        Self::U128(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::F64(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value.into_boxed_str())
    }
}

impl From<Box<str>> for FieldValue {
    fn from(value: Box<str>) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Duration> for FieldValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<SystemTime> for FieldValue {
    fn from(value: SystemTime) -> Self {
        Self::Timestamp(DateTime::<Utc>::from(value))
    }
}

impl From<Vec<Self>> for FieldValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<FieldSet> for FieldValue {
    fn from(value: FieldSet) -> Self {
        Self::Object(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A named, typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field key.
    pub key: Box<str>,
    /// Field value.
    pub value: FieldValue,
}

impl Field {
    /// Build a field from anything convertible into a key and a value.
    pub fn new(key: impl Into<Box<str>>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
