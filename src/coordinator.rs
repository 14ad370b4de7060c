//! Coordinator builder and caller-facing operations.
//!
//! The [`CoordinatorBuilder`] configures the shared channel and the worker
//! thread. The [`Coordinator`] is the caller's proxy:
//! 1. Spawn the worker thread, which builds the engine
//! 2. Listen on the shared channel for the one-time readiness sentinel
//! 3. For every operation, open a private reply channel, post the request
//!    with the reply port attached, and await the single reply
//!
//! Correlation is by reply-channel identity, so any number of operations may
//! be in flight at once and their replies may arrive in any order.
//!
//! # Example
//!
//! ```no_run
//! use renderwire::engine::TextEngine;
//! use renderwire::Coordinator;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> renderwire::Result<()> {
//! let coordinator = Coordinator::builder()
//!     .channel_capacity(64)
//!     .start(|| async { Ok(TextEngine::new()) })
//!     .await?;
//!
//! coordinator.init().await?;
//! coordinator.set_options(r#"{"scale":100}"#).await?;
//! let svg = coordinator.convert_to_output("Hello").await?;
//! assert!(svg.starts_with("<svg"));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::watch;

use crate::codec::MsgPackCodec;
use crate::engine::{Engine, EngineError};
use crate::error::{BridgeError, Result};
use crate::protocol::{Opcode, RequestEnvelope, ResponseEnvelope, READY_SENTINEL};
use crate::transport::{
    message_channel, reply_channel, MessagePort, PortReceiver, PortSender,
    DEFAULT_CHANNEL_CAPACITY,
};
use crate::worker::{spawn_worker, WorkerConfig};

/// Readiness of the worker as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    /// No sentinel received yet.
    Pending,
    /// Sentinel received.
    Ready,
    /// Shared channel closed before any sentinel.
    Failed,
}

/// Builder for configuring and starting a coordinator.
pub struct CoordinatorBuilder {
    channel_capacity: usize,
    worker_config: WorkerConfig,
}

impl CoordinatorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            worker_config: WorkerConfig::default(),
        }
    }

    /// Set the capacity of each direction of the shared channel.
    ///
    /// Posting waits while the channel is full. Must be greater than zero;
    /// `start` rejects `0` with [`BridgeError::InvalidConfig`].
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the worker thread name.
    ///
    /// Default: `renderwire-worker`
    pub fn thread_name(mut self, name: &str) -> Self {
        self.worker_config.thread_name = name.to_string();
        self
    }

    /// Set the page rendered by `convert_to_output`.
    ///
    /// Default: 1
    pub fn render_page(mut self, page: u32) -> Self {
        self.worker_config.render_page = page;
        self
    }

    /// Spawn the worker and start listening for readiness.
    ///
    /// The factory runs on the worker thread; its engine never leaves it.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfig`] if the channel capacity is
    /// zero, or [`BridgeError::Spawn`] if the worker thread cannot start.
    pub async fn start<F, Fut, E>(self, factory: F) -> Result<Coordinator>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<E, EngineError>> + 'static,
        E: Engine + 'static,
    {
        if self.channel_capacity == 0 {
            return Err(BridgeError::InvalidConfig(
                "channel capacity must be greater than zero",
            ));
        }

        let (local, remote) = message_channel(self.channel_capacity);
        let worker = spawn_worker(self.worker_config, remote, factory)?;
        tracing::debug!("Worker thread spawned");

        let mut coordinator = Coordinator::attach(local);
        coordinator.worker = Some(worker);
        Ok(coordinator)
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-side proxy for the worker.
pub struct Coordinator {
    /// Sending half of the shared channel.
    sender: PortSender,
    /// Readiness state published by the listener task.
    readiness: watch::Receiver<Readiness>,
    /// Worker thread handle (`None` when attached to an external worker).
    worker: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Create a new coordinator builder.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Start a coordinator with default settings.
    pub async fn start<F, Fut, E>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<E, EngineError>> + 'static,
        E: Engine + 'static,
    {
        CoordinatorBuilder::new().start(factory).await
    }

    /// Attach to a worker already serving the other end of `port`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(port: MessagePort) -> Self {
        let (sender, receiver) = port.into_split();
        let (ready_tx, readiness) = watch::channel(Readiness::Pending);

        tokio::spawn(Self::await_ready(receiver, ready_tx));

        Self {
            sender,
            readiness,
            worker: None,
        }
    }

    /// Readiness listener: consumes the first sentinel, then goes away.
    async fn await_ready(mut receiver: PortReceiver, ready_tx: watch::Sender<Readiness>) {
        while let Some(message) = receiver.recv().await {
            match MsgPackCodec::decode::<String>(&message.data) {
                Ok(text) if text == READY_SENTINEL => {
                    tracing::info!("Worker initialized");
                    let _ = ready_tx.send(Readiness::Ready);
                    // Dropping the receiver tears the listener down; later
                    // sentinels are never observed.
                    return;
                }
                Ok(text) => tracing::error!("Invalid init message: {:?}", text),
                Err(e) => tracing::error!("Invalid init message: {}", e),
            }
        }

        tracing::error!("Worker exited before announcing readiness");
        let _ = ready_tx.send(Readiness::Failed);
    }

    /// Wait until the worker has announced readiness.
    ///
    /// Every call shares the same one-time outcome. Requests may be issued
    /// before this resolves; they queue on the shared channel.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerUnavailable`] if the worker exits
    /// without announcing readiness (e.g. engine setup failed).
    pub async fn init(&self) -> Result<()> {
        let mut readiness = self.readiness.clone();
        let state = *readiness
            .wait_for(|state| *state != Readiness::Pending)
            .await
            .map_err(|_| BridgeError::WorkerUnavailable)?;

        match state {
            Readiness::Ready => Ok(()),
            _ => Err(BridgeError::WorkerUnavailable),
        }
    }

    /// Whether readiness has been received (non-blocking).
    pub fn is_ready(&self) -> bool {
        *self.readiness.borrow() == Readiness::Ready
    }

    /// Round-trip with no payload.
    pub async fn ping(&self) -> Result<()> {
        self.request(Opcode::Ping, None).await.map(drop)
    }

    /// Current engine configuration, serialized as JSON text.
    pub async fn get_options(&self) -> Result<String> {
        self.request(Opcode::GetOptions, None)
            .await?
            .ok_or(BridgeError::UnexpectedResponse("getOptions"))
    }

    /// Apply a serialized (JSON) configuration.
    pub async fn set_options(&self, options: &str) -> Result<()> {
        self.request(Opcode::SetOptions, Some(options.to_string()))
            .await
            .map(drop)
    }

    /// Restore the engine's default configuration.
    pub async fn reset_options(&self) -> Result<()> {
        self.request(Opcode::ResetOptions, None).await.map(drop)
    }

    /// Load `document` into the engine and render it.
    pub async fn convert_to_output(&self, document: &str) -> Result<String> {
        let started = Instant::now();
        let output = self
            .request(Opcode::ConvertToOutput, Some(document.to_string()))
            .await?
            .ok_or(BridgeError::UnexpectedResponse("convertToOutput"))?;
        tracing::debug!(
            "Rendered {} bytes of output in {:?}",
            output.len(),
            started.elapsed()
        );
        Ok(output)
    }

    /// Wait for readiness, check liveness, then apply `options` if given.
    pub async fn warm_up(&self, options: Option<&str>) -> Result<()> {
        tracing::info!("Initializing worker...");
        self.init().await?;
        self.ping().await?;
        if let Some(options) = options {
            self.set_options(options).await?;
        }
        tracing::info!("Worker warmed up");
        Ok(())
    }

    /// Send a request for `opcode` and await its reply.
    ///
    /// Returns the `response` field on success, or the worker's `error`
    /// text as [`BridgeError::Remote`].
    pub async fn request(&self, opcode: Opcode, data: Option<String>) -> Result<Option<String>> {
        self.send(RequestEnvelope::new(opcode, data)).await
    }

    /// Send a request with an arbitrary opcode identifier.
    ///
    /// The coordinator does not validate the identifier; an unknown one is
    /// answered by the worker with an error.
    pub async fn request_raw(&self, kind: &str, data: Option<String>) -> Result<Option<String>> {
        self.send(RequestEnvelope::raw(kind, data)).await
    }

    async fn send(&self, request: RequestEnvelope) -> Result<Option<String>> {
        let data = MsgPackCodec::encode(&request)?;
        let (port, reply) = reply_channel();

        self.sender.post(data, Some(port)).await?;

        let bytes = reply.recv().await?;
        let response: ResponseEnvelope = MsgPackCodec::decode(&bytes)?;
        response.into_result()
    }

    /// Close the shared channel.
    ///
    /// The worker finishes the request it is handling and exits; queued
    /// requests are dropped and their callers see
    /// [`BridgeError::WorkerUnavailable`].
    pub fn terminate(self) {
        tracing::debug!("Terminating worker");
        drop(self);
    }

    /// Close the shared channel and wait for the worker thread to exit.
    pub async fn shutdown(self) -> Result<()> {
        let Coordinator { sender, worker, .. } = self;
        drop(sender);

        if let Some(worker) = worker {
            let joined = tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|_| BridgeError::WorkerUnavailable)?;
            if joined.is_err() {
                tracing::error!("Worker thread panicked");
                return Err(BridgeError::WorkerUnavailable);
            }
        }
        Ok(())
    }
}
