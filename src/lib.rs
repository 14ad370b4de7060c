//! # renderwire
//!
//! Typed request/response bridge between a caller and a single long-lived
//! rendering worker.
//!
//! The worker owns one [`engine::Engine`] instance on its own thread. The
//! caller talks to it through a [`Coordinator`], whose operations each send
//! an opcode-tagged request over a shared channel together with a private,
//! single-use reply port, and await exactly one reply on it.
//!
//! ## Architecture
//!
//! - **Handshake**: the worker builds its engine, then posts `"ready"` once
//!   on the shared channel; [`Coordinator::init`] resolves on it.
//! - **Correlation**: one fresh reply channel per request, no request IDs.
//! - **Dispatch**: exhaustive match over [`protocol::Opcode`] in
//!   [`handler::Dispatcher`]; every fault becomes an error reply.
//!
//! ## Example
//!
//! ```no_run
//! use renderwire::engine::TextEngine;
//! use renderwire::Coordinator;
//!
//! #[tokio::main]
//! async fn main() -> renderwire::Result<()> {
//!     let coordinator = Coordinator::start(|| async { Ok(TextEngine::new()) }).await?;
//!
//!     coordinator.warm_up(Some(r#"{"scale":100}"#)).await?;
//!     let svg = coordinator.convert_to_output("Hello, world").await?;
//!     println!("{}", svg);
//!
//!     coordinator.shutdown().await
//! }
//! ```

pub mod codec;
pub mod engine;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;
pub mod worker;

mod coordinator;

pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{BridgeError, Result};
pub use protocol::Opcode;
