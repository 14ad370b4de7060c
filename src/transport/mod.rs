//! Transport module - the in-process channels between coordinator and worker.
//!
//! Provides:
//! - [`MessagePort`] - shared, bidirectional, unordered-by-request channel
//! - [`ReplyPort`] / [`ReplyReceiver`] - single-use private reply channel

mod port;

pub use port::{
    message_channel, reply_channel, MessagePort, PortMessage, PortReceiver, PortSender,
    ReplyPort, ReplyReceiver, DEFAULT_CHANNEL_CAPACITY,
};
