//! Docker CLI driver for the replica pool.

use async_trait::async_trait;
use tokio::process::Command;

use crate::{ContainerRuntime, Replica, RuntimeError};

pub const DEFAULT_IMAGE: &str = "eventpulse-app:latest";

/// Label selecting the workload pool.
const SERVICE_LABEL: &str = "service=app";

/// Drives replicas through the `docker` CLI.
pub struct DockerRuntime {
    image: String,
    network: Option<String>,
    runner_id: String,
}

impl DockerRuntime {
    pub fn new(image: &str, network: Option<&str>, runner_id: &str) -> Self {
        let image = image.trim();
        Self {
            image: if image.is_empty() {
                DEFAULT_IMAGE.to_string()
            } else {
                image.to_string()
            },
            network: network
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            runner_id: runner_id.to_string(),
        }
    }

    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }
}

fn docker_cli() -> String {
    std::env::var("DOCKER_CLI").unwrap_or_else(|_| "docker".to_string())
}

async fn docker_cmd(args: &[&str]) -> Result<String, RuntimeError> {
    let output = Command::new(docker_cli()).args(args).output().await?;
    if !output.status.success() {
        return Err(RuntimeError::Command(format!(
            "docker {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_replicas(&self) -> Result<Vec<Replica>, RuntimeError> {
        let filter = format!("label={SERVICE_LABEL}");
        let stdout = docker_cmd(&["ps", "-q", "--filter", &filter]).await?;

        let mut replicas = Vec::new();
        for id in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            // The owner label decides removal preference; a failed inspect
            // just leaves it blank.
            let managed_by = docker_cmd(&[
                "inspect",
                "-f",
                r#"{{ index .Config.Labels "managed-by" }}"#,
                id,
            ])
            .await
            .unwrap_or_default();
            replicas.push(Replica {
                id: id.to_string(),
                managed_by,
            });
        }
        Ok(replicas)
    }

    async fn create_replica(&self) -> Result<String, RuntimeError> {
        let name = format!("app-replica-{}", eventpulse_common::id::monotonic_nanos());
        let managed_by = format!("managed-by={}", self.runner_id);

        let mut args: Vec<&str> = vec![
            "run",
            "-d",
            // Routing labels so the pool stays reachable behind the edge
            // proxy that load-balances /work.
            "--label",
            "traefik.enable=true",
            "--label",
            "traefik.http.routers.app.rule=Path(`/work`)",
            "--label",
            "traefik.http.routers.app.entrypoints=web",
            "--label",
            "traefik.http.services.app.loadbalancer.server.port=8080",
            "--label",
            SERVICE_LABEL,
            "--label",
            &managed_by,
            "--env",
            "SERVICE=app",
            "--env",
            "APP_GOMAXPROCS=1",
            "--restart",
            "always",
        ];
        if let Some(network) = &self.network {
            args.push("--network");
            args.push(network);
        }
        args.push("--name");
        args.push(&name);
        args.push(&self.image);

        docker_cmd(&args).await
    }

    async fn remove_replica(&self, id: &str) -> Result<(), RuntimeError> {
        docker_cmd(&["rm", "-f", id]).await.map(|_| ())
    }
}
