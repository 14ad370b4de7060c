//! Handler module - worker-side request handling.
//!
//! Provides:
//! - [`Dispatcher`] - owns the engine, maps each request to one reply
//! - [`RequestContext`] - reply side of a single request; always replies once

mod context;
mod dispatcher;

pub use context::{RequestContext, ABANDONED_REQUEST};
pub use dispatcher::{DispatchError, Dispatcher, DEFAULT_RENDER_PAGE};
