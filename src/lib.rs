//! VIRTA - Output-delivery core of a plugin-driven metrics agent
//!
//! Accepts a continuous stream of measurement records from input
//! collectors and delivers them, in bounded batches, to downstream sinks,
//! tolerating transient sink failures without losing or reordering data
//! beyond a bounded buffer.
//!
//! # Architecture
//!
//! ```text
//! Input Plugins ──► RunningOutput (buffer, batch, retry) ──► Sink
//! ```
//!
//! Both inputs and sinks are pluggable via traits; serializers encode
//! metrics for sinks that speak a textual wire format.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod metric;
pub mod output;
pub mod registry;
pub mod serialize;
pub mod sink;
pub mod telemetry;
pub mod telemetry_server;

pub use buffer::MetricBuffer;
pub use config::{Config, OutputConfig};
pub use error::{AgentError, PluginError, Result};
pub use metric::{FieldValue, Metric};
pub use output::RunningOutput;
pub use registry::{Input, PluginRegistry};
pub use serialize::{Serializer, SerializerConfig, new_serializer};
pub use sink::Sink;
