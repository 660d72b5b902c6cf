//! Stdout sink for debugging
//!
//! Serializes each metric with the configured serializer and writes the
//! records to stdout. Useful for development and `--test` style runs.

use crate::error::PluginError;
use crate::metric::Metric;
use crate::serialize::Serializer;
use crate::sink::Sink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stdout sink - prints serialized metrics for debugging
pub struct StdoutSink {
    serializer: Box<dyn Serializer>,
    written_count: AtomicU64,
}

impl StdoutSink {
    /// Create a new StdoutSink encoding with the given serializer
    pub fn new(serializer: Box<dyn Serializer>) -> Self {
        Self {
            serializer,
            written_count: AtomicU64::new(0),
        }
    }

    /// Total metrics written
    pub fn written_count(&self) -> u64 {
        self.written_count.load(Ordering::Relaxed)
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new(Box::new(crate::serialize::InfluxSerializer::new()))
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn write(&self, metrics: &[Metric]) -> Result<(), PluginError> {
        use std::io::Write;

        let mut buf = Vec::new();
        for metric in metrics {
            let record = self
                .serializer
                .serialize(metric)
                .map_err(|e| PluginError::Send(e.to_string()))?;
            buf.extend_from_slice(&record);
        }

        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&buf)
            .map_err(|e| PluginError::Send(e.to_string()))?;

        self.written_count
            .fetch_add(metrics.len() as u64, Ordering::Relaxed);

        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}
