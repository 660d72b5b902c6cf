//! InfluxDB-compatible HTTP sink
//!
//! POSTs newline-framed line protocol to a `/write` endpoint. The whole
//! batch goes in one request, so acceptance is atomic: a non-success
//! status rejects the entire batch.
//!
//! # Example
//!
//! ```ignore
//! let sink = InfluxSink::new("http://localhost:8086")?
//!     .database("telemetry");
//! registry.register_output("influxdb", ...);
//! ```

use crate::error::PluginError;
use crate::metric::Metric;
use crate::serialize::{InfluxSerializer, Serializer};
use crate::sink::Sink;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database written to when none is configured
const DEFAULT_DATABASE: &str = "virta";

/// InfluxDB-compatible sink - POSTs line protocol over HTTP
pub struct InfluxSink {
    client: Client,
    base_url: String,
    database: String,
    serializer: InfluxSerializer,
}

impl InfluxSink {
    /// Create a new InfluxSink for the given base URL
    ///
    /// Uses bounded timeouts (30s request, 10s connect) so a hung sink
    /// cannot block a write cycle indefinitely.
    ///
    /// # Errors
    /// Returns `PluginError::Init` if the HTTP client cannot be created
    pub fn new(base_url: impl Into<String>) -> Result<Self, PluginError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PluginError::Init(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            database: DEFAULT_DATABASE.to_string(),
            serializer: InfluxSerializer::new(),
        })
    }

    /// Set the target database
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

#[async_trait]
impl Sink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn write(&self, metrics: &[Metric]) -> Result<(), PluginError> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut body = Vec::new();
        for metric in metrics {
            let record = self
                .serializer
                .serialize(metric)
                .map_err(|e| PluginError::Send(e.to_string()))?;
            body.extend_from_slice(&record);
        }

        let url = format!("{}/write?db={}", self.base_url, self.database);

        match self.client.post(&url).body(body).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!(
                        url = %url,
                        count = metrics.len(),
                        status = %response.status(),
                        "batch written"
                    );
                    Ok(())
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!(url = %url, status = %status, body = %body, "write request failed");
                    Err(PluginError::Send(format!(
                        "server returned {status}: {body}"
                    )))
                }
            }
            Err(e) => {
                error!(url = %url, error = %e, "connection failed");
                Err(PluginError::Connection(format!(
                    "failed to connect to {}: {e}",
                    self.base_url
                )))
            }
        }
    }

    async fn health(&self) -> bool {
        let url = format!("{}/ping", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    debug!(url = %url, status = %response.status(), "health check failed");
                }
                healthy
            }
            Err(e) => {
                debug!(url = %url, error = %e, "health check failed");
                false
            }
        }
    }
}
