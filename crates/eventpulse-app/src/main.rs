//! Synthetic CPU-burn workload: the replica pool the Action Runner scales.

use anyhow::Result;
use axum::extract::Query;
use axum::routing::get;
use axum::Router;
use rand::Rng;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use eventpulse_common::env;

fn main() -> Result<()> {
    // APP_GOMAXPROCS caps the runtime's worker threads so one replica can
    // be pinned to a core budget inside its container.
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(threads) = env::optional("APP_GOMAXPROCS")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
    {
        builder.worker_threads(threads);
    }
    builder.build()?.block_on(run())
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let service = env::string_or("SERVICE", "app");
    let app = Router::new()
        .route("/work", get(work))
        .route("/healthz", get(healthz));

    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(service = %service, addr = %addr, "eventpulse-app listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct WorkParams {
    ms: Option<u64>,
    workers: Option<usize>,
}

/// `GET /work?ms=<int>&workers=<int>`: burn CPU for `ms` milliseconds on
/// `workers` parallel blocking tasks. Without `ms`, the duration is
/// randomized (100–300ms) to create variance under load.
async fn work(Query(params): Query<WorkParams>) -> String {
    let ms = match params.ms.filter(|n| *n > 0) {
        Some(ms) => ms,
        None => rand::thread_rng().gen_range(100..300),
    };
    let workers = params.workers.filter(|n| *n > 0).unwrap_or(1);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(tokio::task::spawn_blocking(move || {
            cpu_burn(Duration::from_millis(ms));
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }

    format!("ok {ms}ms workers={workers}\n")
}

fn cpu_burn(duration: Duration) {
    let end = Instant::now() + duration;
    let mut rng = rand::thread_rng();
    let mut x: f64 = 0.0;
    while Instant::now() < end {
        x += rng.gen::<f64>().sqrt();
        if x > 1e9 {
            x = 0.0;
        }
    }
    std::hint::black_box(x);
}

async fn healthz() -> &'static str {
    "ok"
}
