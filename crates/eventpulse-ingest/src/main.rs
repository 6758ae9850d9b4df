use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use eventpulse_broker::Publisher;
use eventpulse_ingest::app;
use eventpulse_ingest::config::IngestConfig;
use eventpulse_ingest::state::AppState;
use eventpulse_storage::IngestStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let config = IngestConfig::from_env();
    tracing::info!(
        http_port = config.http_port,
        topic = %config.topic_alert_raised,
        "eventpulse-ingest starting"
    );

    let store = Arc::new(IngestStore::connect(&config.db_dsn).await?);
    let publisher = Arc::new(Publisher::connect(config.brokers.as_deref())?);

    let state = AppState {
        store,
        publisher,
        topic_alert_raised: config.topic_alert_raised.clone(),
        ready: true,
    };

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Ingest listening");

    axum::serve(listener, app::build_router(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("Ingest stopped");
    Ok(())
}
