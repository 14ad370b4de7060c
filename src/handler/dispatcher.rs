//! Worker-side request dispatch.
//!
//! The [`Dispatcher`] owns the engine and turns every incoming request into
//! exactly one reply:
//!
//! ```text
//! PortMessage ─► decode ─► match opcode ─► engine call ─► ResponseEnvelope ─► reply port
//!                  │            │               │
//!                  └── error ───┴──── error ────┴──── (panic) ──► error reply
//! ```
//!
//! Requests are handled one at a time, in arrival order, so the engine needs
//! no locking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;

use super::RequestContext;
use crate::codec::MsgPackCodec;
use crate::engine::{Engine, EngineError};
use crate::protocol::{Opcode, RequestEnvelope, ResponseEnvelope, READY_SENTINEL};
use crate::transport::{MessagePort, PortMessage};

/// Page rendered by `CONVERT_TO_OUTPUT` unless configured otherwise.
pub const DEFAULT_RENDER_PAGE: u32 = 1;

/// Faults raised while executing one request.
///
/// Only ever observed as the `error` text of a reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The opcode identifier is not one the worker knows.
    #[error("unknown message type: {0}")]
    UnknownOpcode(String),

    /// A payload-bearing opcode arrived without payload.
    #[error("missing payload for {0}")]
    MissingPayload(Opcode),

    /// Options text is not valid JSON.
    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine rejected the call.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Worker-side handler holding the single engine instance.
pub struct Dispatcher<E> {
    engine: E,
    render_page: u32,
    handled: u64,
}

impl<E: Engine> Dispatcher<E> {
    /// Create a dispatcher around an already constructed engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            render_page: DEFAULT_RENDER_PAGE,
            handled: 0,
        }
    }

    /// Set the page rendered by `CONVERT_TO_OUTPUT`.
    pub fn with_render_page(mut self, page: u32) -> Self {
        self.render_page = page;
        self
    }

    /// Number of requests handled so far.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Handle one request and build its reply.
    ///
    /// Never fails: engine errors and engine panics become error replies.
    pub fn handle(&mut self, request: &RequestEnvelope) -> ResponseEnvelope {
        self.handled += 1;

        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(request))) {
            Ok(Ok(response)) => ResponseEnvelope::ok(response),
            Ok(Err(e)) => {
                let message = e.to_string();
                if message.is_empty() {
                    ResponseEnvelope::err(format!("{} failed", request.kind))
                } else {
                    ResponseEnvelope::err(message)
                }
            }
            Err(payload) => {
                tracing::error!("Engine panicked while handling {}", request.kind);
                let message = panic_message(payload.as_ref());
                ResponseEnvelope::err(format!("engine panicked: {}", message))
            }
        }
    }

    fn execute(&mut self, request: &RequestEnvelope) -> Result<Option<String>, DispatchError> {
        let opcode = request
            .opcode()
            .ok_or_else(|| DispatchError::UnknownOpcode(request.kind.clone()))?;
        let data = request.data.as_deref();
        if opcode.takes_payload() && data.is_none() {
            return Err(DispatchError::MissingPayload(opcode));
        }
        let payload = data.unwrap_or_default();

        match opcode {
            Opcode::Ping => Ok(None),
            Opcode::SetOptions => {
                let options: Value = serde_json::from_str(payload)?;
                self.engine.configure(options)?;
                Ok(None)
            }
            Opcode::GetOptions => {
                let options = self.engine.configuration()?;
                Ok(Some(serde_json::to_string(&options)?))
            }
            Opcode::ResetOptions => {
                self.engine.reset_configuration()?;
                Ok(None)
            }
            Opcode::ConvertToOutput => {
                self.engine.load_document(payload)?;
                Ok(Some(self.engine.render(self.render_page)?))
            }
        }
    }

    /// Handle one message from the shared channel and reply on its port.
    pub fn dispatch_message(&mut self, message: PortMessage) {
        let Some(port) = message.port else {
            tracing::warn!("Dropping message without reply port");
            return;
        };

        let request: RequestEnvelope = match MsgPackCodec::decode(&message.data) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                RequestContext::new("<malformed>", port)
                    .respond(&ResponseEnvelope::err(format!("malformed request: {}", e)));
                return;
            }
        };

        let ctx = RequestContext::new(request.kind.clone(), port);
        tracing::debug!("Processing request {}", ctx.kind());

        let reply = self.handle(&request);
        if let Some(error) = &reply.error {
            tracing::debug!("Request {} failed: {}", ctx.kind(), error);
        }
        ctx.respond(&reply);
    }

    /// Announce readiness, then serve requests until the shared channel closes.
    pub async fn serve(mut self, mut port: MessagePort) {
        match MsgPackCodec::encode(&READY_SENTINEL) {
            Ok(data) => {
                if port.post(data, None).await.is_err() {
                    tracing::warn!("Coordinator stopped listening before readiness");
                }
            }
            Err(e) => tracing::error!("Failed to encode readiness sentinel: {}", e),
        }
        tracing::info!("Worker ready");

        while let Some(message) = port.recv().await {
            self.dispatch_message(message);
        }

        tracing::debug!(
            "Shared channel closed after {} requests, worker exiting",
            self.handled
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{TextEngine, TextOptions};
    use crate::transport::{message_channel, reply_channel};

    fn dispatcher() -> Dispatcher<TextEngine> {
        Dispatcher::new(TextEngine::new())
    }

    fn request(opcode: Opcode, data: Option<&str>) -> RequestEnvelope {
        RequestEnvelope::new(opcode, data.map(str::to_owned))
    }

    /// Engine that panics on every render.
    struct PanickingEngine;

    impl Engine for PanickingEngine {
        fn configure(&mut self, _: Value) -> Result<(), EngineError> {
            Ok(())
        }
        fn configuration(&self) -> Result<Value, EngineError> {
            Ok(Value::Object(Default::default()))
        }
        fn reset_configuration(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn load_document(&mut self, _: &str) -> Result<(), EngineError> {
            Ok(())
        }
        fn render(&mut self, _: u32) -> Result<String, EngineError> {
            panic!("renderer crashed");
        }
    }

    #[test]
    fn test_ping() {
        let reply = dispatcher().handle(&request(Opcode::Ping, None));
        assert_eq!(reply, ResponseEnvelope::ok(None));
    }

    #[test]
    fn test_ping_ignores_payload() {
        let reply = dispatcher().handle(&request(Opcode::Ping, Some("extra")));
        assert_eq!(reply, ResponseEnvelope::ok(None));
    }

    #[test]
    fn test_get_options_returns_json_text() {
        let reply = dispatcher().handle(&request(Opcode::GetOptions, None));
        assert!(reply.error.is_none());

        let parsed: TextOptions = serde_json::from_str(&reply.response.unwrap()).unwrap();
        assert_eq!(parsed, TextOptions::default());
    }

    #[test]
    fn test_set_then_get_options() {
        let mut d = dispatcher();
        let set = d.handle(&request(Opcode::SetOptions, Some(r#"{"scale":55}"#)));
        assert_eq!(set, ResponseEnvelope::ok(None));

        let get = d.handle(&request(Opcode::GetOptions, None));
        let value: Value = serde_json::from_str(get.response.as_deref().unwrap()).unwrap();
        assert_eq!(value["scale"], 55);
    }

    #[test]
    fn test_set_options_with_unparsable_text() {
        let reply = dispatcher().handle(&request(Opcode::SetOptions, Some("{scale:")));
        assert!(reply.response.is_none());
        assert!(reply.error.unwrap().starts_with("invalid options JSON"));
    }

    #[test]
    fn test_set_options_without_payload() {
        let reply = dispatcher().handle(&request(Opcode::SetOptions, None));
        assert_eq!(
            reply.error.as_deref(),
            Some("missing payload for SET_OPTIONS")
        );
    }

    #[test]
    fn test_reset_options() {
        let mut d = dispatcher();
        d.handle(&request(Opcode::SetOptions, Some(r#"{"fontSize":12}"#)));
        let reset = d.handle(&request(Opcode::ResetOptions, None));
        assert_eq!(reset, ResponseEnvelope::ok(None));
        let current = d.handle(&request(Opcode::GetOptions, None)).response.unwrap();
        let current: TextOptions = serde_json::from_str(&current).unwrap();
        assert_eq!(current, TextOptions::default());
    }

    #[test]
    fn test_convert_to_output() {
        let reply = dispatcher().handle(&request(Opcode::ConvertToOutput, Some("hello")));
        assert!(reply.error.is_none());
        assert!(reply.response.unwrap().contains(">hello</text>"));
    }

    #[test]
    fn test_convert_renders_configured_page() {
        let mut d = dispatcher().with_render_page(2);
        d.handle(&request(Opcode::SetOptions, Some(r#"{"linesPerPage":1}"#)));
        let reply = d.handle(&request(Opcode::ConvertToOutput, Some("first\nsecond")));
        let svg = reply.response.unwrap();
        assert!(svg.contains(">second<"));
        assert!(!svg.contains(">first<"));
    }

    #[test]
    fn test_convert_malformed_document() {
        let reply = dispatcher().handle(&request(Opcode::ConvertToOutput, Some("")));
        assert!(reply.response.is_none());
        assert_eq!(
            reply.error.as_deref(),
            Some("invalid document: document is empty")
        );
    }

    #[test]
    fn test_unknown_opcode_names_it() {
        let reply = dispatcher().handle(&RequestEnvelope::raw("CONVERT_TO_PDF", None));
        assert!(reply.response.is_none());
        assert_eq!(
            reply.error.as_deref(),
            Some("unknown message type: CONVERT_TO_PDF")
        );
    }

    #[test]
    fn test_engine_panic_becomes_error_reply() {
        let mut d = Dispatcher::new(PanickingEngine);
        let reply = d.handle(&request(Opcode::ConvertToOutput, Some("x")));
        assert_eq!(
            reply.error.as_deref(),
            Some("engine panicked: renderer crashed")
        );

        // Dispatcher keeps working after the panic.
        assert_eq!(d.handle(&request(Opcode::Ping, None)), ResponseEnvelope::ok(None));
        assert_eq!(d.handled(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_message_replies_on_port() {
        let mut d = dispatcher();
        let (port, reply) = reply_channel();
        let data = MsgPackCodec::encode(&request(Opcode::Ping, None)).unwrap();

        d.dispatch_message(PortMessage {
            data,
            port: Some(port),
        });

        let envelope: ResponseEnvelope = MsgPackCodec::decode(&reply.recv().await.unwrap()).unwrap();
        assert_eq!(envelope, ResponseEnvelope::ok(None));
    }

    #[tokio::test]
    async fn test_dispatch_malformed_bytes() {
        let mut d = dispatcher();
        let (port, reply) = reply_channel();

        d.dispatch_message(PortMessage {
            data: bytes::Bytes::from_static(b"\xc1garbage"),
            port: Some(port),
        });

        let envelope: ResponseEnvelope = MsgPackCodec::decode(&reply.recv().await.unwrap()).unwrap();
        assert!(envelope.error.unwrap().starts_with("malformed request"));
        assert_eq!(d.handled(), 0);
    }

    #[tokio::test]
    async fn test_serve_announces_ready_then_handles_requests() {
        let (mut coordinator, worker) = message_channel(8);
        let server = tokio::spawn(dispatcher().serve(worker));

        let ready = coordinator.recv().await.unwrap();
        let sentinel: String = MsgPackCodec::decode(&ready.data).unwrap();
        assert_eq!(sentinel, READY_SENTINEL);
        assert!(ready.port.is_none());

        let (port, reply) = reply_channel();
        let data = MsgPackCodec::encode(&request(Opcode::GetOptions, None)).unwrap();
        coordinator.post(data, Some(port)).await.unwrap();
        let envelope: ResponseEnvelope = MsgPackCodec::decode(&reply.recv().await.unwrap()).unwrap();
        assert!(envelope.response.is_some());

        drop(coordinator);
        server.await.unwrap();
    }
}
