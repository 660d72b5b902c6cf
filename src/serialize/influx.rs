//! InfluxDB line-protocol serializer
//!
//! Encodes a metric as `name,tag=v field=1.5,count=3i timestamp\n`.
//! Tags are emitted in sorted key order; measurement names, tag keys and
//! values, and field keys escape commas, spaces, and equals signs; string
//! field values are double-quoted with embedded quotes and backslashes
//! escaped.

use super::Serializer;
use crate::error::{AgentError, Result};
use crate::metric::{FieldValue, Metric};
use std::fmt::Write;

/// Stateless line-protocol encoder
#[derive(Debug, Default)]
pub struct InfluxSerializer;

impl InfluxSerializer {
    pub fn new() -> Self {
        Self
    }
}

fn escape_ident(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ").replace('=', "\\=")
}

fn escape_string_value(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn write_field_value(out: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Float(v) => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Int(v) => {
            let _ = write!(out, "{v}i");
        }
        FieldValue::UInt(v) => {
            let _ = write!(out, "{v}i");
        }
        FieldValue::Bool(v) => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Str(v) => {
            let _ = write!(out, "\"{}\"", escape_string_value(v));
        }
    }
}

impl Serializer for InfluxSerializer {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>> {
        if metric.fields.is_empty() {
            return Err(AgentError::Serialization(format!(
                "metric '{}' has no fields",
                metric.name
            )));
        }

        let mut out = String::new();
        out.push_str(&escape_ident(&metric.name));

        for (key, value) in &metric.tags {
            let _ = write!(out, ",{}={}", escape_ident(key), escape_ident(value));
        }

        out.push(' ');
        for (i, (key, value)) in metric.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}=", escape_ident(key));
            write_field_value(&mut out, value);
        }

        let _ = write!(out, " {}", metric.timestamp);
        out.push('\n');

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_basic() {
        let m = Metric::with_timestamp("cpu", 1_500_000_000_000_000_000)
            .with_tag("host", "web-01")
            .with_field("usage_idle", 92.5);

        let serializer = InfluxSerializer::new();
        let bytes = serializer.serialize(&m).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "cpu,host=web-01 usage_idle=92.5 1500000000000000000\n"
        );
    }

    #[test]
    fn test_serialize_multiple_fields_and_tags_sorted() {
        let m = Metric::with_timestamp("mem", 42)
            .with_tag("zone", "eu")
            .with_tag("host", "a")
            .with_field("used", 100i64)
            .with_field("free", 50i64);

        let serializer = InfluxSerializer::new();
        let line = String::from_utf8(serializer.serialize(&m).unwrap()).unwrap();
        // BTreeMap iteration gives sorted tags and fields
        assert_eq!(line, "mem,host=a,zone=eu free=50i,used=100i 42\n");
    }

    #[test]
    fn test_serialize_escaping() {
        let m = Metric::with_timestamp("disk usage", 1)
            .with_tag("path", "/mnt/data,archive")
            .with_field("status", "ok=\"fine\"");

        let serializer = InfluxSerializer::new();
        let line = String::from_utf8(serializer.serialize(&m).unwrap()).unwrap();
        assert_eq!(
            line,
            "disk\\ usage,path=/mnt/data\\,archive status=\"ok=\\\"fine\\\"\" 1\n"
        );
    }

    #[test]
    fn test_serialize_value_types() {
        let m = Metric::with_timestamp("vals", 1)
            .with_field("b", true)
            .with_field("f", 1.25)
            .with_field("i", -3i64)
            .with_field("u", 7u64);

        let serializer = InfluxSerializer::new();
        let line = String::from_utf8(serializer.serialize(&m).unwrap()).unwrap();
        assert_eq!(line, "vals b=true,f=1.25,i=-3i,u=7i 1\n");
    }

    #[test]
    fn test_serialize_no_fields_fails() {
        let m = Metric::with_timestamp("empty", 1);
        let serializer = InfluxSerializer::new();
        assert!(serializer.serialize(&m).is_err());
    }

    #[test]
    fn test_trailing_newline() {
        let m = Metric::with_timestamp("cpu", 1).with_field("v", 1i64);
        let serializer = InfluxSerializer::new();
        let bytes = serializer.serialize(&m).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
    }
}
