use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use eventpulse_incident_api::config::IncidentApiConfig;
use eventpulse_incident_api::state::ApiState;
use eventpulse_incident_api::{app, projector};
use eventpulse_storage::IncidentStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let config = IncidentApiConfig::from_env();
    tracing::info!(
        http_port = config.http_port,
        topics = ?[
            &config.topic_incident_opened,
            &config.topic_action_completed,
            &config.topic_action_failed,
        ],
        "eventpulse-incident-api starting"
    );

    let store = Arc::new(IncidentStore::connect(&config.db_dsn).await?);
    let consumer = eventpulse_broker::subscribe(
        &config.brokers,
        "incident-api",
        &[
            config.topic_incident_opened.as_str(),
            config.topic_action_completed.as_str(),
            config.topic_action_failed.as_str(),
        ],
    )?;

    let consumer_handle = tokio::spawn(projector::run_consumer(store.clone(), consumer));

    let state = ApiState { store, ready: true };
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Incident API listening");

    tokio::select! {
        result = axum::serve(listener, app::build_router(state))
            .with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) =>
        {
            if let Err(error) = result {
                tracing::error!(error = %error, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    consumer_handle.abort();
    tracing::info!("Incident API stopped");
    Ok(())
}
