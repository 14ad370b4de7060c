//! Integration tests for renderwire.
//!
//! These tests drive a real worker thread through the coordinator.

use renderwire::codec::MsgPackCodec;
use renderwire::engine::{Engine, EngineError, TextEngine, TextOptions};
use renderwire::protocol::READY_SENTINEL;
use renderwire::transport::message_channel;
use renderwire::{BridgeError, Coordinator, Opcode};
use serde_json::{json, Value};

async fn started() -> Coordinator {
    let coordinator = Coordinator::start(|| async { Ok(TextEngine::new()) })
        .await
        .unwrap();
    coordinator.init().await.unwrap();
    coordinator
}

fn options(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

/// Every opcode answers a well-formed request with its success shape.
#[tokio::test]
async fn test_all_opcodes_succeed() {
    let c = started().await;

    assert_eq!(c.request(Opcode::Ping, None).await.unwrap(), None);
    assert_eq!(
        c.request(Opcode::SetOptions, Some(r#"{"scale":50}"#.into()))
            .await
            .unwrap(),
        None
    );
    let opts = c.request(Opcode::GetOptions, None).await.unwrap().unwrap();
    assert_eq!(options(&opts)["scale"], 50);
    assert_eq!(c.request(Opcode::ResetOptions, None).await.unwrap(), None);
    let svg = c
        .request(Opcode::ConvertToOutput, Some("line".into()))
        .await
        .unwrap()
        .unwrap();
    assert!(svg.starts_with("<svg"));
}

/// Unknown opcode rejects with a message naming it.
#[tokio::test]
async fn test_unknown_opcode() {
    let c = started().await;

    let err = c.request_raw("CONVERT_TO_SVG", None).await.unwrap_err();
    let message = err.remote_message().unwrap();
    assert!(message.contains("CONVERT_TO_SVG"));
    assert_eq!(message, "unknown message type: CONVERT_TO_SVG");
}

/// set_options followed by get_options round-trips the configuration.
#[tokio::test]
async fn test_set_get_roundtrip() {
    let c = started().await;

    let applied = json!({
        "pageWidth": 1000,
        "pageHeight": 1400,
        "scale": 100,
        "fontSize": 18,
        "lineHeight": 22,
        "margin": 40,
        "linesPerPage": 30
    });
    c.set_options(&applied.to_string()).await.unwrap();

    let returned = options(&c.get_options().await.unwrap());
    assert_eq!(returned, applied);
}

/// reset_options restores defaults regardless of earlier changes.
#[tokio::test]
async fn test_reset_restores_defaults() {
    let c = started().await;

    c.set_options(r#"{"scale":90}"#).await.unwrap();
    c.set_options(r#"{"margin":10,"fontSize":40}"#).await.unwrap();
    c.reset_options().await.unwrap();

    let returned: TextOptions = serde_json::from_str(&c.get_options().await.unwrap()).unwrap();
    assert_eq!(returned, TextOptions::default());
}

/// Invalid options are rejected and leave the configuration untouched.
#[tokio::test]
async fn test_invalid_options_rejected() {
    let c = started().await;
    let before = c.get_options().await.unwrap();

    let err = c.set_options("not json").await.unwrap_err();
    assert!(err.remote_message().unwrap().starts_with("invalid options JSON"));

    let err = c.set_options(r#"{"colour":"red"}"#).await.unwrap_err();
    assert!(err.remote_message().unwrap().contains("colour"));

    assert_eq!(c.get_options().await.unwrap(), before);
}

/// Concurrent requests each settle exactly once; a fault in one does not
/// affect the other.
#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let c = started().await;

    let (a, b) = tokio::join!(c.ping(), c.ping());
    a.unwrap();
    b.unwrap();

    let (bad, good) = tokio::join!(c.convert_to_output(""), c.convert_to_output("fine"));
    assert!(bad.unwrap_err().remote_message().is_some());
    assert!(good.unwrap().contains(">fine<"));
}

/// Many in-flight requests get their own replies back.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_replies_are_not_misattributed() {
    let c = std::sync::Arc::new(started().await);

    let mut tasks = Vec::new();
    for i in 0..32 {
        let c = c.clone();
        tasks.push(tokio::spawn(async move {
            let doc = format!("document {}", i);
            let svg = c.convert_to_output(&doc).await.unwrap();
            assert!(svg.contains(&format!(">{}<", doc)), "reply for {} misrouted", i);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}

/// Malformed input rejects with a reason; the worker keeps serving.
#[tokio::test]
async fn test_malformed_document_then_ping() {
    let c = started().await;

    let err = c.convert_to_output("bad\u{7}document").await.unwrap_err();
    let reason = err.remote_message().unwrap();
    assert!(!reason.is_empty());
    assert!(reason.starts_with("invalid document"));

    c.ping().await.unwrap();
}

/// The readiness future resolves once even if the sentinel is sent twice.
#[tokio::test]
async fn test_duplicate_ready_is_ignored() {
    let (local, worker) = message_channel(8);
    let c = Coordinator::attach(local);

    let sentinel = MsgPackCodec::encode(&READY_SENTINEL).unwrap();
    worker.post(sentinel.clone(), None).await.unwrap();
    c.init().await.unwrap();

    // The listener has been torn down: the second sentinel has no receiver.
    let second = worker.post(sentinel, None).await;
    assert!(matches!(second, Err(BridgeError::WorkerUnavailable)));

    c.init().await.unwrap();
    assert!(c.is_ready());
}

/// Requests may be issued before readiness; they are served once the
/// worker is up.
#[tokio::test]
async fn test_request_before_init() {
    let c = Coordinator::builder()
        .thread_name("slow-engine")
        .start(|| async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(TextEngine::new())
        })
        .await
        .unwrap();

    c.ping().await.unwrap();
    c.init().await.unwrap();
}

/// Engine setup failure makes init fail and requests fail.
#[tokio::test]
async fn test_engine_setup_failure() {
    let c = Coordinator::start(|| async {
        Err::<TextEngine, _>(EngineError::Setup("binary module not found".into()))
    })
    .await
    .unwrap();

    assert!(matches!(c.init().await, Err(BridgeError::WorkerUnavailable)));
    assert!(matches!(c.ping().await, Err(BridgeError::WorkerUnavailable)));
}

/// The engine does not need to be `Send`.
#[tokio::test]
async fn test_non_send_engine() {
    struct LocalEngine {
        inner: std::rc::Rc<std::cell::RefCell<TextEngine>>,
    }

    impl Engine for LocalEngine {
        fn configure(&mut self, options: Value) -> Result<(), EngineError> {
            self.inner.borrow_mut().configure(options)
        }
        fn configuration(&self) -> Result<Value, EngineError> {
            self.inner.borrow().configuration()
        }
        fn reset_configuration(&mut self) -> Result<(), EngineError> {
            self.inner.borrow_mut().reset_configuration()
        }
        fn load_document(&mut self, document: &str) -> Result<(), EngineError> {
            self.inner.borrow_mut().load_document(document)
        }
        fn render(&mut self, page: u32) -> Result<String, EngineError> {
            self.inner.borrow_mut().render(page)
        }
    }

    let c = Coordinator::start(|| async {
        Ok(LocalEngine {
            inner: Default::default(),
        })
    })
    .await
    .unwrap();

    c.warm_up(Some(r#"{"fontSize":20}"#)).await.unwrap();
    assert_eq!(options(&c.get_options().await.unwrap())["fontSize"], 20);
}

/// The configured page is the one rendered.
#[tokio::test]
async fn test_render_page_setting() {
    let c = Coordinator::builder()
        .render_page(2)
        .start(|| async { Ok(TextEngine::new()) })
        .await
        .unwrap();
    c.init().await.unwrap();

    c.set_options(r#"{"linesPerPage":1}"#).await.unwrap();
    let svg = c.convert_to_output("one\ntwo").await.unwrap();
    assert!(svg.contains(">two<"));

    let err = c.convert_to_output("only one").await.unwrap_err();
    assert!(err.remote_message().unwrap().contains("out of range"));
}

/// After shutdown the worker thread has exited.
#[tokio::test]
async fn test_shutdown_joins_worker() {
    let c = started().await;
    c.ping().await.unwrap();
    c.shutdown().await.unwrap();
}
