use thiserror::Error;

/// Errors surfaced by the realtime sync layer.
///
/// Transport and protocol failures are recoverable unless stated otherwise;
/// the reconnection policy decides whether a transport error is retried.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication token missing for endpoint {endpoint}")]
    AuthMissing { endpoint: String },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection open timed out after {seconds} seconds")]
    AcquireTimeout { seconds: u64 },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Reconnection attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
