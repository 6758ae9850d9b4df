use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use eventpulse_action_runner::app;
use eventpulse_action_runner::config::{ActionRunnerConfig, RUNNER_ID};
use eventpulse_action_runner::processor::ActionProcessor;
use eventpulse_broker::Publisher;
use eventpulse_runtime::docker::DockerRuntime;
use eventpulse_storage::RunnerStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let config = ActionRunnerConfig::from_env();
    tracing::info!(
        http_port = config.http_port,
        consume = %config.topic_action_requested,
        image = %config.docker_image,
        "eventpulse-action-runner starting"
    );

    let store = Arc::new(RunnerStore::connect(&config.db_dsn).await?);
    let publisher = Arc::new(Publisher::connect(Some(config.brokers.as_str()))?);
    let runtime = Arc::new(DockerRuntime::new(
        &config.docker_image,
        config.docker_network.as_deref(),
        RUNNER_ID,
    ));
    let consumer = eventpulse_broker::subscribe(
        &config.brokers,
        "action-runner",
        &[config.topic_action_requested.as_str()],
    )?;

    let processor = Arc::new(ActionProcessor::new(
        store,
        runtime,
        publisher,
        RUNNER_ID.to_string(),
        config.topic_action_completed.clone(),
        config.topic_action_failed.clone(),
    ));
    let consumer_handle = tokio::spawn({
        let processor = processor.clone();
        async move { processor.run(consumer).await }
    });

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Action runner listening");

    tokio::select! {
        result = axum::serve(listener, app::build_router(true))
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
    tracing::info!("Action runner stopped");
    Ok(())
}
