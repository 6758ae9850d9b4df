//! Webhook sink that pretty-logs whatever Alertmanager sends; useful when
//! wiring up routing without the real ingest in the loop.

use anyhow::Result;
use axum::body::Bytes;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let app = Router::new()
        .route("/alertmanager", post(dump_webhook))
        .route("/", get(|| async { "webhook-debug up" }));

    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "webhook-debug listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn dump_webhook(body: Bytes) -> &'static str {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => {
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| value.to_string());
            tracing::info!("Alertmanager webhook:\n{pretty}");
        }
        Err(_) => {
            tracing::info!(raw = %String::from_utf8_lossy(&body), "Alertmanager webhook (raw)");
        }
    }
    "received"
}
