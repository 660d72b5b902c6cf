//! Error types for virta

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Main error type for the agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unrecognized serializer data format
    #[error("unsupported data format: {format}")]
    UnsupportedFormat { format: String },

    /// The sink rejected a batch
    #[error("sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry registration error
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// Error type for plugin operations
#[derive(Error, Debug)]
pub enum PluginError {
    /// Initialization failed
    #[error("initialization failed: {0}")]
    Init(String),

    /// Input gather failed
    #[error("gather failed: {0}")]
    Gather(String),

    /// Send to sink failed
    #[error("send failed: {0}")]
    Send(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Shutdown error
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

impl From<PluginError> for AgentError {
    fn from(err: PluginError) -> Self {
        AgentError::SinkWrite {
            sink: "unknown".to_string(),
            message: err.to_string(),
        }
    }
}
