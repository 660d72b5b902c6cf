//! Sink system for virta
//!
//! Sinks deliver batches of metrics to destinations (a time-series
//! database, stdout, etc.). A sink either durably accepts the whole batch
//! or rejects it atomically; partial acceptance is not part of the
//! contract.

pub mod influx;
pub mod stdout;

use crate::error::PluginError;
use crate::metric::Metric;
use async_trait::async_trait;

pub use influx::InfluxSink;
pub use stdout::StdoutSink;

/// Sink trait - delivers ordered batches of metrics
///
/// # Example
///
/// ```ignore
/// struct MyDatabaseSink {
///     client: MyClient,
/// }
///
/// #[async_trait]
/// impl Sink for MyDatabaseSink {
///     fn name(&self) -> &'static str { "my-database" }
///
///     async fn write(&self, metrics: &[Metric]) -> Result<(), PluginError> {
///         self.client.insert(metrics).await?;
///         Ok(())
///     }
///
///     async fn health(&self) -> bool {
///         self.client.ping().await.is_ok()
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Sink name for identification and logging
    fn name(&self) -> &'static str;

    /// Write an ordered batch of metrics to the destination
    ///
    /// Must accept all of the batch or reject all of it.
    async fn write(&self, metrics: &[Metric]) -> Result<(), PluginError>;

    /// Health check for the destination
    async fn health(&self) -> bool;

    /// Graceful shutdown
    ///
    /// Called when the agent is shutting down to flush buffers, close
    /// connections, etc.
    async fn shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
