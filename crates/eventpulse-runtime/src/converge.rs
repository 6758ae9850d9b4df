//! Idempotent convergence of the replica pool to a target count.

use std::future::Future;
use std::time::Duration;

use crate::{ContainerRuntime, RuntimeError};

/// Upper bound on one convergence attempt; a slower runtime fails the
/// action rather than wedging the consumer.
pub const CONVERGE_DEADLINE: Duration = Duration::from_secs(60);

/// Brings the count of `service=app` replicas to `desired`.
///
/// Creation and removal are each retried once on failure. Removal prefers
/// replicas this runner owns (`managed-by == runner_id`); only when those
/// do not suffice does a second pass force-remove arbitrary replicas. When
/// the count already matches, neither create nor remove is called.
pub async fn converge<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    runner_id: &str,
    desired: usize,
) -> Result<(), RuntimeError> {
    tokio::time::timeout(CONVERGE_DEADLINE, converge_inner(runtime, runner_id, desired))
        .await
        .map_err(|_| RuntimeError::Deadline(CONVERGE_DEADLINE))?
}

async fn converge_inner<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    runner_id: &str,
    desired: usize,
) -> Result<(), RuntimeError> {
    let current = runtime.list_replicas().await?;

    if current.len() < desired {
        let missing = desired - current.len();
        tracing::info!(have = current.len(), desired, missing, "Creating replicas");
        for _ in 0..missing {
            retry_once(|| runtime.create_replica()).await?;
        }
    } else if current.len() > desired {
        let mut to_remove = current.len() - desired;
        tracing::info!(have = current.len(), desired, surplus = to_remove, "Removing replicas");

        for replica in &current {
            if to_remove == 0 {
                break;
            }
            if replica.managed_by != runner_id {
                continue;
            }
            match retry_once(|| runtime.remove_replica(&replica.id)).await {
                Ok(()) => to_remove -= 1,
                Err(error) => {
                    tracing::warn!(id = %replica.id, error = %error, "Replica removal failed");
                }
            }
        }

        if to_remove > 0 {
            // Not enough owned replicas: fall back to force-removing
            // whatever is left in the pool.
            for replica in runtime.list_replicas().await? {
                if to_remove == 0 {
                    break;
                }
                match retry_once(|| runtime.remove_replica(&replica.id)).await {
                    Ok(()) => to_remove -= 1,
                    Err(error) => {
                        tracing::warn!(id = %replica.id, error = %error, "Forced replica removal failed");
                    }
                }
            }
        }
    }

    let settled = runtime.list_replicas().await?;
    if settled.len() != desired {
        return Err(RuntimeError::Converge {
            have: settled.len(),
            desired,
        });
    }
    Ok(())
}

async fn retry_once<T, F, Fut>(op: F) -> Result<T, RuntimeError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RuntimeError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::warn!(error = %error, "Container operation failed, retrying once");
            op().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Replica;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRuntime {
        replicas: Mutex<Vec<Replica>>,
        create_calls: AtomicUsize,
        remove_calls: AtomicUsize,
        /// Creates that error before succeeding.
        create_failures: AtomicUsize,
        /// When set, create pretends to succeed without adding a replica.
        create_is_a_lie: bool,
    }

    impl FakeRuntime {
        fn with_replicas(replicas: Vec<Replica>) -> Self {
            Self {
                replicas: Mutex::new(replicas),
                ..Default::default()
            }
        }

        fn owned(id: &str, managed_by: &str) -> Replica {
            Replica {
                id: id.to_string(),
                managed_by: managed_by.to_string(),
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn list_replicas(&self) -> Result<Vec<Replica>, RuntimeError> {
            Ok(self.replicas.lock().unwrap().clone())
        }

        async fn create_replica(&self) -> Result<String, RuntimeError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.create_failures.load(Ordering::SeqCst) > 0 {
                self.create_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RuntimeError::Command("docker run failed: boom".into()));
            }
            let id = format!("c{}", self.create_calls.load(Ordering::SeqCst));
            if !self.create_is_a_lie {
                self.replicas
                    .lock()
                    .unwrap()
                    .push(FakeRuntime::owned(&id, "action-runner"));
            }
            Ok(id)
        }

        async fn remove_replica(&self, id: &str) -> Result<(), RuntimeError> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            self.replicas.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn scales_up_from_empty() {
        let runtime = FakeRuntime::default();
        converge(&runtime, "action-runner", 2).await.unwrap();
        assert_eq!(runtime.replicas.lock().unwrap().len(), 2);
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 2);
        assert_eq!(runtime.remove_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scales_down_preferring_own_replicas() {
        let runtime = FakeRuntime::with_replicas(vec![
            FakeRuntime::owned("foreign", "other-runner"),
            FakeRuntime::owned("mine-1", "action-runner"),
            FakeRuntime::owned("mine-2", "action-runner"),
        ]);
        converge(&runtime, "action-runner", 1).await.unwrap();

        let left = runtime.replicas.lock().unwrap().clone();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "foreign", "owned replicas go first");
    }

    #[tokio::test]
    async fn falls_back_to_foreign_replicas_when_short() {
        let runtime = FakeRuntime::with_replicas(vec![
            FakeRuntime::owned("foreign-1", "other-runner"),
            FakeRuntime::owned("foreign-2", ""),
            FakeRuntime::owned("mine", "action-runner"),
        ]);
        converge(&runtime, "action-runner", 1).await.unwrap();
        assert_eq!(runtime.replicas.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn matching_count_touches_nothing() {
        let runtime = FakeRuntime::with_replicas(vec![
            FakeRuntime::owned("a", "action-runner"),
            FakeRuntime::owned("b", "action-runner"),
        ]);
        converge(&runtime, "action-runner", 2).await.unwrap();
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.remove_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn desired_zero_empties_the_pool() {
        let runtime = FakeRuntime::with_replicas(vec![
            FakeRuntime::owned("a", "action-runner"),
            FakeRuntime::owned("b", "other-runner"),
        ]);
        converge(&runtime, "action-runner", 0).await.unwrap();
        assert!(runtime.replicas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_create_failure_is_retried_once() {
        let runtime = FakeRuntime::default();
        runtime.create_failures.store(1, Ordering::SeqCst);
        converge(&runtime, "action-runner", 1).await.unwrap();
        assert_eq!(runtime.replicas.lock().unwrap().len(), 1);
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_create_failure_fails_the_action() {
        let runtime = FakeRuntime::default();
        runtime.create_failures.store(2, Ordering::SeqCst);
        let err = converge(&runtime, "action-runner", 1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Command(_)));
    }

    #[tokio::test]
    async fn mismatch_after_settling_is_a_convergence_error() {
        let runtime = FakeRuntime {
            create_is_a_lie: true,
            ..Default::default()
        };
        let err = converge(&runtime, "action-runner", 2).await.unwrap_err();
        match err {
            RuntimeError::Converge { have, desired } => {
                assert_eq!(have, 0);
                assert_eq!(desired, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
