//! Prometheus telemetry for virta
//!
//! Process-level counters for the delivery pipeline. Named "telemetry" to
//! keep it distinct from the metrics the agent itself collects and ships.

use crate::error::{AgentError, Result};
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder, register_counter_vec, register_gauge,
    register_histogram_vec,
};
use std::sync::OnceLock;

/// Global telemetry instance
static TELEMETRY: OnceLock<Telemetry> = OnceLock::new();

/// Serializes registration so racing initializers can't double-register
/// collectors against the default prometheus registry.
static INIT_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

/// All agent telemetry
pub struct Telemetry {
    /// Metrics written to sinks (by output)
    pub metrics_written: CounterVec,

    /// Metrics dropped (by reason)
    pub metrics_dropped: CounterVec,

    /// Buffered metrics as of the last write cycle
    pub buffer_size: Gauge,

    /// Configured buffer limit
    pub buffer_limit: Gauge,

    /// Sink write latency (by output)
    pub write_duration: HistogramVec,
}

impl Telemetry {
    /// Initialize telemetry (call once at startup)
    ///
    /// Returns an error if metric registration fails.
    pub fn init() -> Result<&'static Telemetry> {
        let _guard = INIT_LOCK.lock();
        if let Some(telemetry) = TELEMETRY.get() {
            return Ok(telemetry);
        }

        let telemetry = Telemetry {
            metrics_written: register_counter_vec!(
                "virta_metrics_written_total",
                "Total metrics written to sinks",
                &["output"]
            )
            .map_err(|e| AgentError::Telemetry(format!("metrics_written: {e}")))?,

            metrics_dropped: register_counter_vec!(
                "virta_metrics_dropped_total",
                "Total metrics dropped",
                &["reason"]
            )
            .map_err(|e| AgentError::Telemetry(format!("metrics_dropped: {e}")))?,

            buffer_size: register_gauge!(
                "virta_buffer_size",
                "Buffered metrics as of the last write cycle"
            )
            .map_err(|e| AgentError::Telemetry(format!("buffer_size: {e}")))?,

            buffer_limit: register_gauge!("virta_buffer_limit", "Configured buffer limit")
                .map_err(|e| AgentError::Telemetry(format!("buffer_limit: {e}")))?,

            write_duration: register_histogram_vec!(
                "virta_write_duration_seconds",
                "Sink write latency",
                &["output"],
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
            )
            .map_err(|e| AgentError::Telemetry(format!("write_duration: {e}")))?,
        };

        let _ = TELEMETRY.set(telemetry);

        TELEMETRY
            .get()
            .ok_or_else(|| AgentError::Telemetry("failed to initialize telemetry".to_string()))
    }

    /// Get the global telemetry instance
    ///
    /// Returns None if telemetry hasn't been initialized; recording sites
    /// skip silently in that case, so the core works without it.
    pub fn get() -> Option<&'static Telemetry> {
        TELEMETRY.get()
    }

    /// Record metrics written to a sink
    pub fn record_written(&self, output: &str, count: u64) {
        self.metrics_written
            .with_label_values(&[output])
            .inc_by(count as f64);
    }

    /// Record dropped metrics
    pub fn record_dropped(&self, reason: &str, count: u64) {
        self.metrics_dropped
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }

    /// Set the sampled buffer size
    pub fn set_buffer_size(&self, size: f64) {
        self.buffer_size.set(size);
    }

    /// Record one sink write duration
    pub fn observe_write(&self, output: &str, seconds: f64) {
        self.write_duration
            .with_label_values(&[output])
            .observe(seconds);
    }
}

/// Render all registered telemetry in Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = Telemetry::init().unwrap();
        let second = Telemetry::init().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_record_and_gather() {
        let telemetry = Telemetry::init().unwrap();

        telemetry.record_written("test-output", 5);
        telemetry.record_dropped("overflow", 2);
        telemetry.set_buffer_size(17.0);

        let rendered = gather();
        assert!(rendered.contains("virta_metrics_written_total"));
        assert!(rendered.contains("virta_buffer_size 17"));
    }
}
