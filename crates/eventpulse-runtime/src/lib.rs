//! Container runtime access for the Action Runner.
//!
//! The runner converges the `service=app` replica pool through the
//! [`ContainerRuntime`] trait; [`docker::DockerRuntime`] drives the docker
//! CLI, and tests substitute an in-memory fake.

pub mod converge;
pub mod docker;

use async_trait::async_trait;
use std::time::Duration;

/// One `service=app` container, with the owner recorded at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub id: String,
    /// Value of the `managed-by` label; empty when the container was not
    /// created by a runner.
    pub managed_by: String,
}

/// Errors from container operations and the convergence loop.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn container command: {0}")]
    Io(#[from] std::io::Error),

    #[error("container command failed: {0}")]
    Command(String),

    #[error("replica convergence failed: have={have} desired={desired}")]
    Converge { have: usize, desired: usize },

    #[error("convergence timed out after {0:?}")]
    Deadline(Duration),
}

/// Minimal replica pool operations the convergence loop needs.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Enumerates containers labelled `service=app`.
    async fn list_replicas(&self) -> Result<Vec<Replica>, RuntimeError>;

    /// Creates one replica owned by this runner; returns the container id.
    async fn create_replica(&self) -> Result<String, RuntimeError>;

    /// Force-removes a container by id.
    async fn remove_replica(&self, id: &str) -> Result<(), RuntimeError>;
}
