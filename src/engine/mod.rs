//! Engine module - the rendering capability owned by the worker.
//!
//! The worker never talks to a rendering library directly; it drives
//! whatever implements [`Engine`]. Every call may fail, and the worker turns
//! each failure into an error reply for the request that caused it.
//!
//! [`TextEngine`] is a small built-in engine that renders plain-text
//! documents to SVG.

mod text;

use serde_json::Value;
use thiserror::Error;

pub use text::{TextEngine, TextOptions};

/// Errors raised by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Options were rejected (wrong shape, unknown key, out of range).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The source document could not be loaded.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Rendering was requested before any document was loaded.
    #[error("no document loaded")]
    NoDocument,

    /// Requested page does not exist.
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested page (1-based).
        page: u32,
        /// Number of pages in the loaded document.
        count: u32,
    },

    /// Engine construction failed.
    #[error("engine setup failed: {0}")]
    Setup(String),

    /// Any other engine fault.
    #[error("{0}")]
    Other(String),
}

/// Capability contract the worker requires of a rendering engine.
///
/// Implementations need not be `Send`: the engine is built and used on the
/// worker thread only.
pub trait Engine {
    /// Merge the given options into the current configuration.
    fn configure(&mut self, options: Value) -> Result<(), EngineError>;

    /// Current configuration as a JSON object.
    fn configuration(&self) -> Result<Value, EngineError>;

    /// Restore the default configuration.
    fn reset_configuration(&mut self) -> Result<(), EngineError>;

    /// Load a source document, replacing any previous one.
    fn load_document(&mut self, document: &str) -> Result<(), EngineError>;

    /// Render one page (1-based) of the loaded document.
    fn render(&mut self, page: u32) -> Result<String, EngineError>;
}
