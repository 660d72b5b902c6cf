//! JSON serializer
//!
//! Encodes a metric as a single JSON object per line. The timestamp is
//! rendered truncated to the configured unit (seconds by default), matching
//! downstream consumers that expect coarse-grained timestamps.

use super::Serializer;
use crate::error::{AgentError, Result};
use crate::metric::{FieldValue, Metric};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// JSON encoder parameterized by a timestamp unit
#[derive(Debug)]
pub struct JsonSerializer {
    timestamp_units: Duration,
}

#[derive(Serialize)]
struct MetricJson<'a> {
    fields: &'a BTreeMap<String, FieldValue>,
    name: &'a str,
    tags: &'a BTreeMap<String, String>,
    timestamp: i64,
}

impl JsonSerializer {
    /// Create a JSON serializer. A zero unit falls back to seconds.
    pub fn new(timestamp_units: Duration) -> Self {
        let timestamp_units = if timestamp_units.is_zero() {
            Duration::from_secs(1)
        } else {
            timestamp_units
        };
        Self { timestamp_units }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>> {
        let units_ns = self.timestamp_units.as_nanos() as i64;
        let record = MetricJson {
            fields: &metric.fields,
            name: &metric.name,
            tags: &metric.tags,
            timestamp: metric.timestamp / units_ns,
        };

        let mut out = serde_json::to_vec(&record)
            .map_err(|e| AgentError::Serialization(e.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }
}
