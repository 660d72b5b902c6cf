//! virta - plugin-driven metrics collection agent
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (stdout output, line protocol)
//! cargo run
//!
//! # Ship to an InfluxDB-compatible server
//! VIRTA_OUTPUT=influxdb VIRTA_INFLUX_URL=http://db:8086 cargo run
//! ```
//!
//! ## Environment Variables
//!
//! - `VIRTA_OUTPUT`: output plugin name (default: "stdout")
//! - `VIRTA_DATA_FORMAT`: serializer for the stdout output (default: "influx")
//! - `VIRTA_BATCH_SIZE`: metrics per write batch (default: 1000)
//! - `VIRTA_BUFFER_LIMIT`: buffered metrics per queue (default: 10000)
//! - `VIRTA_FLUSH_INTERVAL_MS`: flush interval (default: 10000)
//! - `VIRTA_TELEMETRY_ADDR`: telemetry server address (default: "0.0.0.0:9273")
//! - `VIRTA_LOG_LEVEL`: log level (default: "info")
//! - `VIRTA_LOG_FORMAT`: "json" or "pretty" (default: "pretty")

use anyhow::Context;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use virta::config::{Config, LogFormat, OutputConfig};
use virta::output::{RunningOutput, flush_loop};
use virta::registry::{PluginRegistry, register_builtins};
use virta::serialize::{SerializerConfig, new_serializer};
use virta::sink::{Sink, StdoutSink};
use virta::telemetry::Telemetry;
use virta::telemetry_server::TelemetryServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        batch_size = config.batch_size,
        buffer_limit = config.buffer_limit,
        flush_interval_ms = config.flush_interval_ms,
        "starting virta"
    );

    let telemetry = Telemetry::init()?;
    telemetry.buffer_limit.set(config.buffer_limit as f64);
    let telemetry_handle = TelemetryServer::start(config.telemetry_addr);

    let mut registry = PluginRegistry::new();
    register_builtins(&mut registry);
    info!(
        inputs = ?registry.input_names(),
        outputs = ?registry.output_names(),
        "plugins registered"
    );

    let output_name = env::var("VIRTA_OUTPUT").unwrap_or_else(|_| "stdout".to_string());
    let sink: Arc<dyn Sink> = match output_name.as_str() {
        "stdout" => {
            let serializer_config = SerializerConfig {
                data_format: env::var("VIRTA_DATA_FORMAT")
                    .unwrap_or_else(|_| "influx".to_string()),
                ..Default::default()
            };
            Arc::new(StdoutSink::new(new_serializer(&serializer_config)?))
        }
        name => registry
            .create_output(name)
            .with_context(|| format!("constructing output '{name}'"))?,
    };
    info!(output = %output_name, "output configured");

    let output = Arc::new(RunningOutput::new(
        sink,
        OutputConfig::new(&output_name),
        config.batch_size,
        config.buffer_limit,
    ));

    // Collection scheduling is external; registered inputs get a simple
    // periodic gather loop here.
    let mut gather_handles = Vec::new();
    let collect_interval = Duration::from_millis(
        env::var("VIRTA_COLLECT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000),
    );
    for name in registry.input_names() {
        let input = registry
            .create_input(&name)
            .with_context(|| format!("constructing input '{name}'"))?;
        let output = Arc::clone(&output);
        gather_handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(collect_interval);
            loop {
                ticker.tick().await;
                match input.gather() {
                    Ok(metrics) => {
                        for metric in metrics {
                            output.add_metric(metric).await;
                        }
                    }
                    Err(e) => error!(input = input.name(), error = %e, "gather failed"),
                }
            }
        }));
    }

    let flush_handle = tokio::spawn(flush_loop(
        Arc::clone(&output),
        Duration::from_millis(config.flush_interval_ms),
    ));

    shutdown_signal().await;

    for handle in gather_handles {
        handle.abort();
    }
    flush_handle.abort();
    telemetry_handle.abort();

    // Best-effort final flush; metrics still failing at this point are lost
    if let Err(e) = output.write().await {
        error!(output = %output.name, error = %e, "final flush failed");
    }
    info!(
        written = output.metrics_written(),
        dropped = output.metrics_dropped(),
        "virta shutdown complete"
    );

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
