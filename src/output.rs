//! Running output - the per-sink delivery pipeline
//!
//! A RunningOutput accepts metrics from collectors, buffers them in two
//! bounded queues (fresh metrics and metrics whose write already failed),
//! and flushes them to its sink in size-bounded batches. Failed batches
//! are retried ahead of new data on the next cycle, so delivery order
//! follows arrival order even across sink outages.

use crate::buffer::MetricBuffer;
use crate::config::OutputConfig;
use crate::error::{AgentError, Result};
use crate::metric::Metric;
use crate::sink::Sink;
use crate::telemetry::Telemetry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// The per-sink pipeline: ingestion, buffering, batching, and retry
pub struct RunningOutput {
    /// Output instance name
    pub name: String,
    config: OutputConfig,
    sink: Arc<dyn Sink>,
    batch_size: usize,

    metrics: MetricBuffer,
    fail_metrics: MetricBuffer,

    /// Total metrics successfully written to the sink
    metrics_written: AtomicU64,
    /// Buffered metrics across both queues, sampled at each write cycle
    buffer_size: AtomicU64,
    /// Cumulative time spent in successful sink calls, in nanoseconds
    write_time_ns: AtomicU64,

    // Guards against concurrent calls to the sink: the periodic flush and
    // the flush-when-full fast path can race.
    write_lock: Mutex<()>,
}

impl RunningOutput {
    /// Create a new running output over the given sink
    pub fn new(
        sink: Arc<dyn Sink>,
        config: OutputConfig,
        batch_size: usize,
        buffer_limit: usize,
    ) -> Self {
        Self {
            name: config.name.clone(),
            config,
            sink,
            batch_size,
            metrics: MetricBuffer::new(buffer_limit),
            fail_metrics: MetricBuffer::new(buffer_limit),
            metrics_written: AtomicU64::new(0),
            buffer_size: AtomicU64::new(0),
            write_time_ns: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Add one metric to the output
    ///
    /// When the append fills the queue to exactly one batch, a full batch
    /// is flushed synchronously (flush-when-full fast path). A failure of
    /// that flush is absorbed into the failure queue, not surfaced.
    pub async fn add_metric(&self, metric: Metric) {
        if metric.is_empty() {
            return;
        }

        let dropped = self.metrics.add([metric]);
        if dropped > 0 {
            warn!(output = %self.name, dropped, "buffer overflow, oldest metrics dropped");
            if let Some(t) = Telemetry::get() {
                t.record_dropped("overflow", dropped as u64);
            }
        }

        if self.metrics.len() == self.batch_size {
            let batch = self.metrics.batch(self.batch_size);
            if let Err(e) = self.write_batch(&batch).await {
                debug!(output = %self.name, error = %e, "fast-path flush failed, batch queued for retry");
                self.fail_metrics.add(batch);
            }
        }
    }

    /// Write all buffered metrics to the sink
    ///
    /// Previously failed batches are retried first, in their original
    /// order. One failed sink call short-circuits the remaining attempts
    /// of this cycle - a down sink is assumed to stay down for the rest of
    /// the cycle - but every unattempted batch still rotates into the
    /// failure queue so its place in line is preserved.
    pub async fn write(&self) -> Result<()> {
        let n_fails = self.fail_metrics.len();
        let n_metrics = self.metrics.len();
        self.buffer_size
            .store((n_fails + n_metrics) as u64, Ordering::Relaxed);
        if let Some(t) = Telemetry::get() {
            t.set_buffer_size((n_fails + n_metrics) as f64);
        }
        debug!(
            output = %self.name,
            fullness = n_fails + n_metrics,
            limit = self.metrics.limit(),
            "buffer fullness"
        );

        let mut write_err: Option<AgentError> = None;

        if n_fails > 0 {
            // How many batches of failed writes we need to write.
            let n_batches = n_fails / self.batch_size + 1;
            let mut batch_size = self.batch_size;

            for i in 0..n_batches {
                // The last batch only grabs the metrics that have not had a
                // write attempt already, to preserve order. When n_fails is
                // an exact multiple of the batch size that remainder is
                // zero and the extraction yields nothing.
                if i == n_batches - 1 {
                    batch_size = n_fails % self.batch_size;
                }
                let batch = self.fail_metrics.batch(batch_size);

                // After the first failure, don't bother trying this sink
                // again this cycle. The loop keeps running so the metrics
                // rotate back in order.
                if write_err.is_none() {
                    if let Err(e) = self.write_batch(&batch).await {
                        write_err = Some(e);
                    }
                }
                if write_err.is_some() {
                    self.fail_metrics.add(batch);
                }
            }
        }

        let batch = self.metrics.batch(self.batch_size);
        // Same policy as above: if the fail queue was empty, write_err is
        // still None here and the batch gets its attempt.
        if write_err.is_none() {
            if let Err(e) = self.write_batch(&batch).await {
                write_err = Some(e);
            }
        }

        if let Some(err) = write_err {
            self.fail_metrics.add(batch);
            return Err(err);
        }
        Ok(())
    }

    /// Write one batch to the sink under the write lock
    ///
    /// No-op for an empty batch. On success the written and write-time
    /// counters advance; on failure they do not.
    async fn write_batch(&self, metrics: &[Metric]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let start = Instant::now();
        let result = self.sink.write(metrics).await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                debug!(
                    output = %self.name,
                    count = metrics.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "wrote batch"
                );
                self.metrics_written
                    .fetch_add(metrics.len() as u64, Ordering::Relaxed);
                self.write_time_ns
                    .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
                if let Some(t) = Telemetry::get() {
                    t.record_written(&self.name, metrics.len() as u64);
                    t.observe_write(&self.name, elapsed.as_secs_f64());
                }
                Ok(())
            }
            Err(e) => Err(AgentError::SinkWrite {
                sink: self.sink.name().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Output configuration this instance was built from
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Total metrics successfully written
    pub fn metrics_written(&self) -> u64 {
        self.metrics_written.load(Ordering::Relaxed)
    }

    /// Buffered metrics as of the last write cycle
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size.load(Ordering::Relaxed)
    }

    /// Cumulative successful sink-call time
    pub fn write_time(&self) -> Duration {
        Duration::from_nanos(self.write_time_ns.load(Ordering::Relaxed))
    }

    /// Metrics currently waiting for their first write attempt
    pub fn pending(&self) -> usize {
        self.metrics.len()
    }

    /// Metrics whose write failed and that await retry
    pub fn failed(&self) -> usize {
        self.fail_metrics.len()
    }

    /// Total metrics dropped on overflow across both queues
    pub fn metrics_dropped(&self) -> u64 {
        self.metrics.total_dropped() + self.fail_metrics.total_dropped()
    }
}

/// Periodic flush driver for one running output
///
/// Calls `write` on a fixed interval and logs returned errors; sink
/// failures never escalate past the owning output. Runs until aborted.
pub async fn flush_loop(output: Arc<RunningOutput>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so startup doesn't flush
    // an empty buffer.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = output.write().await {
            error!(output = %output.name, error = %e, "flush failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that records every delivered batch and can be told to fail
    /// the next N calls.
    #[derive(Default)]
    struct RecordingSink {
        written: SyncMutex<Vec<Metric>>,
        batch_sizes: SyncMutex<Vec<usize>>,
        calls: AtomicUsize,
        fail_next: AtomicUsize,
        in_flight: AtomicUsize,
        overlapped: AtomicUsize,
    }

    impl RecordingSink {
        fn fail_next(&self, n: usize) {
            self.fail_next.store(n, Ordering::SeqCst);
        }

        fn written_names(&self) -> Vec<String> {
            self.written.lock().iter().map(|m| m.name.clone()).collect()
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn write(&self, metrics: &[Metric]) -> std::result::Result<(), PluginError> {
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.fetch_add(1, Ordering::SeqCst);
            }
            // Yield so overlapping callers would actually interleave here
            tokio::task::yield_now().await;

            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail_next.load(Ordering::SeqCst) > 0 {
                self.fail_next.fetch_sub(1, Ordering::SeqCst);
                Err(PluginError::Connection("simulated failure".into()))
            } else {
                self.batch_sizes.lock().push(metrics.len());
                self.written.lock().extend_from_slice(metrics);
                Ok(())
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn make_metric(name: &str) -> Metric {
        Metric::with_timestamp(name, 1).with_field("v", 1i64)
    }

    fn make_output(sink: &Arc<RecordingSink>, batch_size: usize, limit: usize) -> RunningOutput {
        RunningOutput::new(
            Arc::clone(sink) as Arc<dyn Sink>,
            OutputConfig::new("test"),
            batch_size,
            limit,
        )
    }

    #[tokio::test]
    async fn test_write_delivers_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 10, 100);

        for name in ["a", "b", "c"] {
            ro.add_metric(make_metric(name)).await;
        }
        ro.write().await.unwrap();

        assert_eq!(sink.written_names(), vec!["a", "b", "c"]);
        assert_eq!(ro.metrics_written(), 3);
        assert_eq!(ro.pending(), 0);
        assert_eq!(ro.failed(), 0);
    }

    #[tokio::test]
    async fn test_empty_write_makes_no_sink_call() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 10, 100);

        ro.write().await.unwrap();

        assert_eq!(sink.calls(), 0);
        assert!(ro.write_time().is_zero());
    }

    #[tokio::test]
    async fn test_empty_metric_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 10, 100);

        ro.add_metric(Metric::new("")).await;

        assert_eq!(ro.pending(), 0);
    }

    #[tokio::test]
    async fn test_flush_when_full_fast_path() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 2, 10);

        ro.add_metric(make_metric("a")).await;
        assert_eq!(sink.calls(), 0);

        // Second metric fills one batch; flushes without write()
        ro.add_metric(make_metric("b")).await;
        assert_eq!(sink.calls(), 1);
        assert_eq!(sink.written_names(), vec!["a", "b"]);
        assert_eq!(ro.pending(), 0);
    }

    #[tokio::test]
    async fn test_fast_path_failure_is_absorbed() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 2, 10);
        sink.fail_next(1);

        ro.add_metric(make_metric("a")).await;
        ro.add_metric(make_metric("b")).await;

        // No error surfaced; the batch waits in the failure queue
        assert_eq!(ro.failed(), 2);
        assert_eq!(ro.metrics_written(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_retried_before_new_metrics() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 2, 10);

        // Fast path flush of [a, b] fails
        sink.fail_next(1);
        ro.add_metric(make_metric("a")).await;
        ro.add_metric(make_metric("b")).await;
        ro.add_metric(make_metric("c")).await;

        assert_eq!(ro.failed(), 2);
        assert_eq!(ro.pending(), 1);

        // Next cycle delivers [a, b] then [c]
        ro.write().await.unwrap();
        assert_eq!(sink.written_names(), vec!["a", "b", "c"]);
        assert_eq!(*sink.batch_sizes.lock(), vec![2, 1]);
        assert_eq!(ro.failed(), 0);
        assert_eq!(ro.pending(), 0);
    }

    #[tokio::test]
    async fn test_failing_write_returns_error_and_queues_batch() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 10, 100);
        sink.fail_next(1);

        ro.add_metric(make_metric("a")).await;
        let err = ro.write().await.err().expect("write should fail");
        assert!(matches!(err, AgentError::SinkWrite { .. }));

        assert_eq!(ro.failed(), 1);
        assert_eq!(ro.metrics_written(), 0);
    }

    #[tokio::test]
    async fn test_one_failure_short_circuits_the_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 2, 100);

        // Queue three failed batches worth of metrics
        sink.fail_next(3);
        for name in ["a", "b", "c", "d", "e", "f"] {
            ro.add_metric(make_metric(name)).await;
        }
        assert_eq!(ro.failed(), 6);
        let calls_before = sink.calls();

        // Still down: only the first retry batch gets a sink call, the
        // rest rotate straight back into the failure queue
        sink.fail_next(1);
        assert!(ro.write().await.is_err());
        assert_eq!(sink.calls() - calls_before, 1);
        assert_eq!(ro.failed(), 6);

        // Recovery delivers everything, original order intact
        ro.write().await.unwrap();
        assert_eq!(sink.written_names(), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[tokio::test]
    async fn test_exact_multiple_fail_queue_final_batch_is_empty() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 2, 100);

        sink.fail_next(1);
        ro.add_metric(make_metric("a")).await;
        ro.add_metric(make_metric("b")).await;
        assert_eq!(ro.failed(), 2);

        // n_fails == batch_size: two retry batches computed, the second
        // zero-sized, so exactly one sink call happens
        let calls_before = sink.calls();
        ro.write().await.unwrap();
        assert_eq!(sink.calls() - calls_before, 1);
        assert_eq!(sink.written_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_no_loss_across_failing_cycles() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 3, 100);

        for i in 0..7 {
            ro.add_metric(make_metric(&format!("m{i}"))).await;
        }

        // Two failing cycles, then recovery
        sink.fail_next(1);
        assert!(ro.write().await.is_err());
        sink.fail_next(1);
        assert!(ro.write().await.is_err());

        while ro.failed() + ro.pending() > 0 {
            ro.write().await.unwrap();
        }

        let names: Vec<String> = (0..7).map(|i| format!("m{i}")).collect();
        assert_eq!(sink.written_names(), names);
        assert_eq!(ro.metrics_written(), 7);
    }

    #[tokio::test]
    async fn test_buffer_size_counter_sampled_on_write() {
        let sink = Arc::new(RecordingSink::default());
        let ro = make_output(&sink, 10, 100);

        ro.add_metric(make_metric("a")).await;
        ro.add_metric(make_metric("b")).await;
        ro.write().await.unwrap();

        // Sampled at the top of the cycle, before extraction
        assert_eq!(ro.buffer_size(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_ingestion_never_overlaps_sink_calls() {
        let sink = Arc::new(RecordingSink::default());
        let ro = Arc::new(make_output(&sink, 5, 10_000));

        let mut handles = Vec::new();
        for w in 0..4 {
            let ro = Arc::clone(&ro);
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    ro.add_metric(make_metric(&format!("w{w}-{i}"))).await;
                }
            }));
        }
        let writer = {
            let ro = Arc::clone(&ro);
            tokio::spawn(async move {
                for _ in 0..20 {
                    let _ = ro.write().await;
                    tokio::task::yield_now().await;
                }
            })
        };

        for h in handles {
            h.await.unwrap();
        }
        writer.await.unwrap();
        while ro.failed() + ro.pending() > 0 {
            ro.write().await.unwrap();
        }

        assert_eq!(sink.overlapped.load(Ordering::SeqCst), 0);
        assert_eq!(ro.metrics_written(), 1000);
    }
}
