//! Protocol module - opcodes and message envelopes.
//!
//! This module defines the single shared vocabulary of the bridge:
//! - [`Opcode`] - the closed set of operations the worker understands
//! - [`RequestEnvelope`] / [`ResponseEnvelope`] - what travels in each direction
//! - [`READY_SENTINEL`] - the one-time readiness announcement

mod envelope;
mod opcode;

pub use envelope::{RequestEnvelope, ResponseEnvelope, READY_SENTINEL};
pub use opcode::Opcode;
