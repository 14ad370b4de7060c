//! Per-request reply context.
//!
//! A [`RequestContext`] owns the private reply port of one request. It sends
//! exactly one reply: either the one passed to [`RequestContext::respond`],
//! or, if the context is dropped without responding (early return, panic
//! unwinding), an error reply from its `Drop` impl.

use crate::codec::MsgPackCodec;
use crate::protocol::ResponseEnvelope;
use crate::transport::ReplyPort;

/// Error text sent when a request is abandoned without a reply.
pub const ABANDONED_REQUEST: &str = "request dropped without a reply";

/// Reply side of a single request.
#[derive(Debug)]
pub struct RequestContext {
    /// Wire identifier of the request's opcode (for logs).
    kind: String,
    /// Reply port; `None` once the reply has been sent.
    port: Option<ReplyPort>,
}

impl RequestContext {
    /// Create a context for the request carrying `port`.
    pub fn new(kind: impl Into<String>, port: ReplyPort) -> Self {
        Self {
            kind: kind.into(),
            port: Some(port),
        }
    }

    /// Wire identifier of the request.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Send the reply, consuming the context.
    ///
    /// Returns `false` if the coordinator stopped listening; the reply is
    /// then discarded.
    pub fn respond(mut self, reply: &ResponseEnvelope) -> bool {
        match self.port.take() {
            Some(port) => deliver(&self.kind, port, reply),
            None => false,
        }
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if let Some(port) = self.port.take() {
            tracing::warn!("Request {} abandoned, sending error reply", self.kind);
            deliver(&self.kind, port, &ResponseEnvelope::err(ABANDONED_REQUEST));
        }
    }
}

fn deliver(kind: &str, port: ReplyPort, reply: &ResponseEnvelope) -> bool {
    let data = match MsgPackCodec::encode(reply) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Failed to encode reply for {}: {}", kind, e);
            match MsgPackCodec::encode(&ResponseEnvelope::err(e.to_string())) {
                Ok(data) => data,
                Err(_) => return false,
            }
        }
    };

    let delivered = port.post(data);
    if !delivered {
        tracing::debug!("Reply for {} discarded, requester gone", kind);
    }
    delivered
}
