//! Serializer selection for virta
//!
//! Serializers turn one metric into a byte encoding for sinks that speak a
//! textual wire format. Each encoded record ends with a trailing newline,
//! so a multi-metric buffer is built by plain concatenation.

pub mod influx;
pub mod json;

use crate::error::{AgentError, Result};
use crate::metric::Metric;
use std::time::Duration;

pub use influx::InfluxSerializer;
pub use json::JsonSerializer;

/// Serializer trait - encodes one metric per call
///
/// The caller is responsible for concatenating multiple encoded records;
/// every record carries its own trailing newline.
pub trait Serializer: Send + Sync {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>>;
}

/// Configuration covering the options of all serializer types
///
/// Can be used to instantiate any of the serializers; fields that don't
/// apply to the selected format are ignored.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// One of: "influx", "json"
    pub data_format: String,

    /// Prefix to add to all measurements (template-based formats only)
    pub prefix: String,

    /// Template for rendering measurements (template-based formats only)
    pub template: String,

    /// Timestamp granularity for JSON output
    pub timestamp_units: Duration,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            data_format: "influx".to_string(),
            prefix: String::new(),
            template: String::new(),
            timestamp_units: Duration::from_secs(1),
        }
    }
}

/// Build a Serializer from the given config
///
/// Fails with `UnsupportedFormat` for an unrecognized data format.
pub fn new_serializer(config: &SerializerConfig) -> Result<Box<dyn Serializer>> {
    match config.data_format.as_str() {
        "influx" => Ok(Box::new(InfluxSerializer::new())),
        "json" => Ok(Box::new(JsonSerializer::new(config.timestamp_units))),
        other => Err(AgentError::UnsupportedFormat {
            format: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_influx_serializer() {
        let config = SerializerConfig::default();
        assert!(new_serializer(&config).is_ok());
    }

    #[test]
    fn test_new_json_serializer() {
        let config = SerializerConfig {
            data_format: "json".to_string(),
            ..Default::default()
        };
        assert!(new_serializer(&config).is_ok());
    }

    #[test]
    fn test_unsupported_format() {
        let config = SerializerConfig {
            data_format: "xml".to_string(),
            ..Default::default()
        };

        let err = new_serializer(&config).err().expect("should fail");
        match err {
            AgentError::UnsupportedFormat { format } => assert_eq!(format, "xml"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
