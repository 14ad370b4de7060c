//! Operation codes shared by the coordinator and the worker.
//!
//! On the wire an opcode travels as its string identifier (`"PING"`,
//! `"SET_OPTIONS"`, ...). The request envelope keeps the raw string so the
//! worker can answer identifiers it does not recognize with an error instead
//! of failing to decode the message.

use std::fmt;

/// Operation identifier understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Liveness round-trip, no payload.
    Ping,
    /// Apply a serialized configuration to the engine.
    SetOptions,
    /// Read the engine configuration as serialized text.
    GetOptions,
    /// Restore the engine's default configuration.
    ResetOptions,
    /// Load a source document and render it.
    ConvertToOutput,
}

impl Opcode {
    /// Every opcode, in declaration order.
    pub const ALL: [Opcode; 5] = [
        Opcode::Ping,
        Opcode::SetOptions,
        Opcode::GetOptions,
        Opcode::ResetOptions,
        Opcode::ConvertToOutput,
    ];

    /// Wire identifier for this opcode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Opcode::Ping => "PING",
            Opcode::SetOptions => "SET_OPTIONS",
            Opcode::GetOptions => "GET_OPTIONS",
            Opcode::ResetOptions => "RESET_OPTIONS",
            Opcode::ConvertToOutput => "CONVERT_TO_OUTPUT",
        }
    }

    /// Parse a wire identifier. Matching is exact (case-sensitive).
    pub fn from_wire(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == kind)
    }

    /// Whether requests with this opcode carry a payload.
    pub const fn takes_payload(self) -> bool {
        matches!(self, Opcode::SetOptions | Opcode::ConvertToOutput)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
