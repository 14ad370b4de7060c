//! Request and response envelopes.
//!
//! ```text
//! coordinator ── { type, data } + reply port ──► worker
//! coordinator ◄── { response, error } on port ── worker
//! ```

use serde::{Deserialize, Serialize};

use super::Opcode;
use crate::error::{BridgeError, Result};

/// Sentinel the worker posts on the shared channel once its engine is built.
pub const READY_SENTINEL: &str = "ready";

/// Request sent from the coordinator to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Opcode wire identifier.
    #[serde(rename = "type")]
    pub kind: String,
    /// Opcode-specific payload (serialized options or a source document).
    pub data: Option<String>,
}

impl RequestEnvelope {
    /// Create a request for a known opcode.
    pub fn new(opcode: Opcode, data: Option<String>) -> Self {
        Self::raw(opcode.as_str(), data)
    }

    /// Create a request with an arbitrary wire identifier.
    pub fn raw(kind: impl Into<String>, data: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// The opcode, if the identifier is recognized.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_wire(&self.kind)
    }
}

/// Reply sent from the worker on the request's private port.
///
/// At most one of `response` and `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Result value; `None` for operations with no meaningful return value.
    pub response: Option<String>,
    /// Error text when the operation failed.
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Successful reply.
    pub fn ok(response: Option<String>) -> Self {
        Self {
            response,
            error: None,
        }
    }

    /// Failed reply.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(message.into()),
        }
    }

    /// Convert into the caller-facing result.
    pub fn into_result(self) -> Result<Option<String>> {
        match self.error {
            Some(message) => Err(BridgeError::Remote(message)),
            None => Ok(self.response),
        }
    }
}
