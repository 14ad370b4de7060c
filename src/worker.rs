//! Dedicated worker thread hosting the engine.
//!
//! The worker runs on its own OS thread with a current-thread tokio runtime,
//! so it has a single cooperative loop of its own and the engine never has to
//! be `Send`.
//!
//! # Lifecycle
//!
//! ```text
//! spawn_worker ─► thread start ─► factory().await ─┬─► Err: log, exit (no readiness)
//!                                                  └─► Ok: post "ready", serve until closed
//! ```

use std::future::Future;
use std::thread::JoinHandle;

use crate::engine::{Engine, EngineError};
use crate::error::Result;
use crate::handler::{Dispatcher, DEFAULT_RENDER_PAGE};
use crate::transport::MessagePort;

/// Default name of the worker thread.
pub const DEFAULT_THREAD_NAME: &str = "renderwire-worker";

/// Configuration for the worker thread.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name given to the worker thread.
    pub thread_name: String,
    /// Page rendered by `CONVERT_TO_OUTPUT`.
    pub render_page: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            render_page: DEFAULT_RENDER_PAGE,
        }
    }
}

/// Build the engine, then serve the shared channel until it closes.
///
/// If the factory fails the worker exits without announcing readiness.
pub async fn run_worker<F, Fut, E>(port: MessagePort, factory: F, render_page: u32)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<E, EngineError>>,
    E: Engine,
{
    tracing::debug!("Building engine");
    let engine = match factory().await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Engine setup failed: {}", e);
            return;
        }
    };

    Dispatcher::new(engine)
        .with_render_page(render_page)
        .serve(port)
        .await;
}

/// Spawn the worker thread.
///
/// # Returns
///
/// The thread's join handle. Dropping it detaches the thread, which exits on
/// its own once the coordinator side of `port` is dropped.
pub fn spawn_worker<F, Fut, E>(
    config: WorkerConfig,
    port: MessagePort,
    factory: F,
) -> Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<E, EngineError>> + 'static,
    E: Engine + 'static,
{
    let render_page = config.render_page;
    let handle = std::thread::Builder::new()
        .name(config.thread_name)
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to build worker runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(run_worker(port, factory, render_page));
        })?;

    Ok(handle)
}
