//! Render demo - boot the worker, configure it, render a document.
//!
//! This demo shows:
//! - Starting a coordinator with the built-in text engine
//! - Warming up the worker with initial options
//! - Rendering a document and handling a rejected request
//!
//! # Running
//!
//! ```text
//! RUST_LOG=renderwire=debug cargo run --example render -- path/to/document.txt
//! ```
//!
//! Without a path, a short built-in document is rendered.

use renderwire::engine::TextEngine;
use renderwire::Coordinator;
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = "renderwire\n\nOne request, one reply port, one answer.";

const OPTIONS: &str = r#"{"scale":60,"fontSize":28,"lineHeight":36}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let document = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };

    let coordinator = Coordinator::builder()
        .thread_name("render-demo-worker")
        .start(|| async { Ok(TextEngine::new()) })
        .await?;

    coordinator.warm_up(Some(OPTIONS)).await?;
    tracing::info!("options: {}", coordinator.get_options().await?);

    let svg = coordinator.convert_to_output(&document).await?;
    println!("{}", svg);

    // Rejections come back as the worker's error text.
    if let Err(e) = coordinator.convert_to_output("").await {
        tracing::warn!("expected rejection: {}", e);
    }

    coordinator.shutdown().await?;
    Ok(())
}
