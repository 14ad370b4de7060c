//! Error types for renderwire.

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The worker answered the request with an error string.
    ///
    /// The string is the Dispatcher's error text, passed through verbatim.
    #[error("{0}")]
    Remote(String),

    /// JSON serialization/deserialization error (options text).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// The worker is gone: it failed to start, or exited before replying.
    #[error("Worker unavailable")]
    WorkerUnavailable,

    /// A successful reply did not carry the value the operation expects.
    #[error("Unexpected response for {0}")]
    UnexpectedResponse(&'static str),

    /// A builder setting is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The worker thread could not be spawned.
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl BridgeError {
    /// The remote error text, if this error came from the worker.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            BridgeError::Remote(message) => Some(message),
            _ => None,
        }
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
