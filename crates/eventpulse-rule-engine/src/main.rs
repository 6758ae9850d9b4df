use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use eventpulse_broker::Publisher;
use eventpulse_rule_engine::app;
use eventpulse_rule_engine::config::RuleEngineConfig;
use eventpulse_rule_engine::engine::RuleEngine;
use eventpulse_rule_engine::supervisor::Supervisor;
use eventpulse_storage::RuleStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let config = RuleEngineConfig::from_env();
    tracing::info!(
        http_port = config.http_port,
        consume = %config.topic_alert_raised,
        "eventpulse-rule-engine starting"
    );

    let store = Arc::new(RuleStore::connect(&config.db_dsn).await?);
    let publisher = Arc::new(Publisher::connect(Some(config.brokers.as_str()))?);
    let consumer = eventpulse_broker::subscribe(
        &config.brokers,
        "rule-engine",
        &[config.topic_alert_raised.as_str()],
    )?;

    let engine = Arc::new(RuleEngine::new(
        store.clone(),
        publisher.clone(),
        config.topic_incident_opened.clone(),
        config.topic_action_requested.clone(),
    ));
    let consumer_handle = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run(consumer).await }
    });

    let supervisor_handle = match &config.supervisor {
        Some(supervisor_config) => {
            let supervisor = Supervisor::new(
                supervisor_config,
                store.clone(),
                publisher.clone(),
                config.topic_incident_opened.clone(),
                config.topic_action_requested.clone(),
            )?;
            Some(tokio::spawn(supervisor.run()))
        }
        None => {
            tracing::info!("Runner supervisor disabled");
            None
        }
    };

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Rule engine listening");

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
    if let Some(handle) = supervisor_handle {
        handle.abort();
    }
    tracing::info!("Rule engine stopped");
    Ok(())
}
