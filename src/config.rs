//! Configuration for virta

use crate::error::{AgentError, Result};
use std::env;
use std::net::SocketAddr;

/// Default number of metrics per write batch
pub const DEFAULT_METRIC_BATCH_SIZE: usize = 1000;

/// Default number of metrics kept per queue. Intended to be a multiple of
/// the batch size.
pub const DEFAULT_METRIC_BUFFER_LIMIT: usize = 10_000;

/// Main agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telemetry server address
    pub telemetry_addr: SocketAddr,

    /// Metrics per write batch
    pub batch_size: usize,

    /// Maximum metrics buffered per queue
    pub buffer_limit: usize,

    /// Flush interval in milliseconds
    pub flush_interval_ms: u64,

    /// Log level
    pub log_level: String,

    /// Log format (json or pretty)
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry_addr: SocketAddr::from(([0, 0, 0, 0], 9273)),
            batch_size: DEFAULT_METRIC_BATCH_SIZE,
            buffer_limit: DEFAULT_METRIC_BUFFER_LIMIT,
            flush_interval_ms: 10_000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(addr) = env::var("VIRTA_TELEMETRY_ADDR") {
            config.telemetry_addr = addr
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid VIRTA_TELEMETRY_ADDR: {e}")))?;
        }

        if let Ok(size) = env::var("VIRTA_BATCH_SIZE") {
            config.batch_size = size
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid VIRTA_BATCH_SIZE: {e}")))?;
        }

        if let Ok(limit) = env::var("VIRTA_BUFFER_LIMIT") {
            config.buffer_limit = limit
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid VIRTA_BUFFER_LIMIT: {e}")))?;
        }

        if let Ok(interval) = env::var("VIRTA_FLUSH_INTERVAL_MS") {
            config.flush_interval_ms = interval
                .parse()
                .map_err(|e| AgentError::Config(format!("invalid VIRTA_FLUSH_INTERVAL_MS: {e}")))?;
        }

        if let Ok(level) = env::var("VIRTA_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(format) = env::var("VIRTA_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(AgentError::Config(format!(
                        "invalid VIRTA_LOG_FORMAT: {other} (expected 'json' or 'pretty')"
                    )))
                }
            };
        }

        if config.batch_size == 0 {
            return Err(AgentError::Config("batch size must be non-zero".into()));
        }
        if config.buffer_limit < config.batch_size {
            return Err(AgentError::Config(
                "buffer limit must be at least the batch size".into(),
            ));
        }

        Ok(config)
    }
}

/// Per-output configuration, consumed once when the running output is
/// constructed.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Output instance name
    pub name: String,
}

impl OutputConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
