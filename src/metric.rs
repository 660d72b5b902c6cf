//! Metric value type for virta
//!
//! A Metric is one timestamped measurement record: a name, a set of tags,
//! a set of fields, and a unix-nanosecond timestamp. The delivery core
//! treats it as opaque payload; only serializers look inside.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single field value on a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Str(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInt(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// One measurement record
///
/// Tags and fields use ordered maps so encodings are deterministic.
///
/// # Example
///
/// ```
/// use virta::metric::Metric;
///
/// let m = Metric::new("cpu")
///     .with_tag("host", "web-01")
///     .with_field("usage_idle", 92.5);
/// assert_eq!(m.name, "cpu");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Measurement name
    pub name: String,

    /// Tag set (dimension key/values)
    pub tags: BTreeMap<String, String>,

    /// Field set (measured values)
    pub fields: BTreeMap<String, FieldValue>,

    /// Unix timestamp in nanoseconds
    pub timestamp: i64,
}

impl Metric {
    /// Create a new Metric with the current timestamp and no tags or fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
        }
    }

    /// Create a Metric with an explicit timestamp (unix nanoseconds)
    pub fn with_timestamp(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Add a tag to the metric
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field to the metric
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// A metric with no name carries no measurement; used as the no-op
    /// case at the ingestion boundary.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}
