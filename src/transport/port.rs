//! In-process message ports.
//!
//! Two kinds of conduit connect the coordinator and the worker:
//!
//! - A shared, bidirectional [`MessagePort`] pair created once per worker.
//!   Requests flow down it; the readiness sentinel flows up.
//! - A private [`ReplyPort`] / [`ReplyReceiver`] pair created per request.
//!   The port travels with the request and carries exactly one reply back.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use renderwire::transport::{message_channel, reply_channel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> renderwire::Result<()> {
//! let (coordinator, mut worker) = message_channel(8);
//!
//! let (port, reply) = reply_channel();
//! coordinator.post(Bytes::from_static(b"request"), Some(port)).await?;
//!
//! let message = worker.recv().await.unwrap();
//! assert!(message.port.unwrap().post(Bytes::from_static(b"reply")));
//! assert_eq!(&reply.recv().await?[..], b"reply");
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::{BridgeError, Result};

/// Default capacity of each direction of the shared channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A message on the shared channel: encoded data plus an optional reply port.
#[derive(Debug)]
pub struct PortMessage {
    /// Encoded payload.
    pub data: Bytes,
    /// Private port to answer on, if the sender expects a reply.
    pub port: Option<ReplyPort>,
}

/// Worker-bound end of a per-request reply channel.
///
/// Consumed by [`ReplyPort::post`], so at most one reply can ever be sent.
#[derive(Debug)]
pub struct ReplyPort {
    tx: oneshot::Sender<Bytes>,
}

impl ReplyPort {
    /// Send the reply.
    ///
    /// Returns `false` if the requesting side stopped listening.
    pub fn post(self, data: Bytes) -> bool {
        self.tx.send(data).is_ok()
    }
}

/// Retained end of a per-request reply channel.
#[derive(Debug)]
pub struct ReplyReceiver {
    rx: oneshot::Receiver<Bytes>,
}

impl ReplyReceiver {
    /// Wait for the single reply.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerUnavailable`] if the port was dropped
    /// without a reply, which only happens when the worker goes away.
    pub async fn recv(self) -> Result<Bytes> {
        self.rx.await.map_err(|_| BridgeError::WorkerUnavailable)
    }
}

/// Create a fresh single-use reply channel.
pub fn reply_channel() -> (ReplyPort, ReplyReceiver) {
    let (tx, rx) = oneshot::channel();
    (ReplyPort { tx }, ReplyReceiver { rx })
}

/// Sending half of a [`MessagePort`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PortSender {
    tx: mpsc::Sender<PortMessage>,
}

impl PortSender {
    /// Post a message to the other end.
    ///
    /// Waits while the channel is at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WorkerUnavailable`] if the other end is gone.
    pub async fn post(&self, data: Bytes, port: Option<ReplyPort>) -> Result<()> {
        self.tx
            .send(PortMessage { data, port })
            .await
            .map_err(|_| BridgeError::WorkerUnavailable)
    }
}

/// Receiving half of a [`MessagePort`].
#[derive(Debug)]
pub struct PortReceiver {
    rx: mpsc::Receiver<PortMessage>,
}

impl PortReceiver {
    /// Receive the next message, or `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<PortMessage> {
        self.rx.recv().await
    }
}

/// One end of the shared bidirectional channel.
#[derive(Debug)]
pub struct MessagePort {
    sender: PortSender,
    receiver: PortReceiver,
}

impl MessagePort {
    /// Post a message to the other end.
    pub async fn post(&self, data: Bytes, port: Option<ReplyPort>) -> Result<()> {
        self.sender.post(data, port).await
    }

    /// Receive the next message from the other end.
    pub async fn recv(&mut self) -> Option<PortMessage> {
        self.receiver.recv().await
    }

    /// Split into independently owned halves.
    pub fn into_split(self) -> (PortSender, PortReceiver) {
        (self.sender, self.receiver)
    }
}

/// Create a connected pair of message ports.
///
/// `capacity` bounds each direction independently.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn message_channel(capacity: usize) -> (MessagePort, MessagePort) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);

    let a = MessagePort {
        sender: PortSender { tx: a_tx },
        receiver: PortReceiver { rx: a_rx },
    };
    let b = MessagePort {
        sender: PortSender { tx: b_tx },
        receiver: PortReceiver { rx: b_rx },
    };
    (a, b)
}
