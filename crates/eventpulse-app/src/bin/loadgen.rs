//! Paced HTTP load generator for the workload pool.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use eventpulse_common::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventpulse=info".parse()?))
        .init();

    let target = env::string_or("TARGET_URL", "http://traefik/work");
    let rate = env::string_or("RATE", "50")
        .parse::<u32>()
        .ok()
        .filter(|r| *r > 0)
        .unwrap_or(10);
    let concurrency = env::string_or("CONCURRENCY", "10")
        .parse::<usize>()
        .ok()
        .filter(|c| *c > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let ok_count = Arc::new(AtomicU64::new(0));
    let err_count = Arc::new(AtomicU64::new(0));
    let mut sent: u64 = 0;
    let started = Instant::now();

    tracing::info!(target = %target, rate, concurrency, "loadgen starting");

    let mut tick = tokio::time::interval(Duration::from_secs(1) / rate);
    loop {
        tick.tick().await;
        let permit = semaphore.clone().acquire_owned().await?;
        sent += 1;

        let client = client.clone();
        let target = target.clone();
        let task_ok_count = ok_count.clone();
        let task_err_count = err_count.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match client.get(&target).send().await {
                Ok(response) if response.status().is_success() => {
                    task_ok_count.fetch_add(1, Ordering::Relaxed);
                }
                _ => {
                    task_err_count.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        if sent % 500 == 0 {
            tracing::info!(
                sent,
                ok = ok_count.load(Ordering::Relaxed),
                err = err_count.load(Ordering::Relaxed),
                elapsed_secs = started.elapsed().as_secs(),
                "loadgen stats"
            );
        }
    }
}
