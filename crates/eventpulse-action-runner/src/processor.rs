use std::sync::Arc;
use std::time::Duration;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;

use eventpulse_broker::Publisher;
use eventpulse_common::id;
use eventpulse_common::time::now_rfc3339;
use eventpulse_common::types::{action_kind, kind, ActionResult, Event};
use eventpulse_runtime::converge::converge;
use eventpulse_runtime::ContainerRuntime;
use eventpulse_storage::{action_status, ActionStart, RunnerStore};

/// Executes `action.requested` messages with at-most-once effect per
/// action id.
pub struct ActionProcessor {
    store: Arc<RunnerStore>,
    runtime: Arc<dyn ContainerRuntime>,
    publisher: Arc<Publisher>,
    runner_id: String,
    topic_action_completed: String,
    topic_action_failed: String,
}

impl ActionProcessor {
    pub fn new(
        store: Arc<RunnerStore>,
        runtime: Arc<dyn ContainerRuntime>,
        publisher: Arc<Publisher>,
        runner_id: String,
        topic_action_completed: String,
        topic_action_failed: String,
    ) -> Self {
        Self {
            store,
            runtime,
            publisher,
            runner_id,
            topic_action_completed,
            topic_action_failed,
        }
    }

    /// Handles one consumed message.
    ///
    /// The inbox claim and the `running` row commit together before any
    /// container is touched; the terminal row and result event commit
    /// together afterwards. A redelivered action short-circuits at the
    /// claim and touches nothing.
    pub async fn process(&self, payload: &[u8]) -> anyhow::Result<()> {
        let request = match Event::parse(payload) {
            Ok(Event::ActionRequested(request)) => request,
            Ok(other) => {
                tracing::debug!(kind = other.kind(), "Ignoring non-action event");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(error = %error, "Dropping undecodable message");
                return Ok(());
            }
        };

        let now = now_rfc3339();
        let action_id = if request.dedup_key.is_empty() {
            id::fallback_dedup_key()
        } else {
            request.dedup_key.clone()
        };
        let desired = request.desired_replicas.unwrap_or(1).max(0);

        let start = ActionStart {
            action_id: action_id.clone(),
            kind: request.kind.clone(),
            desired_replicas: desired,
            alert_fp: request.alert_fp.clone(),
        };
        if self
            .store
            .begin_action(&action_id, &start, &now)
            .await?
            .is_duplicate()
        {
            tracing::debug!(action_id = %action_id, "Duplicate action delivery, skipping");
            return Ok(());
        }

        tracing::info!(
            action_id = %action_id,
            kind = %request.kind,
            desired,
            alert_fp = %request.alert_fp,
            "Executing action"
        );

        match self.execute(&request.kind, desired as usize).await {
            Ok(()) => {
                self.finish(&start, &action_id, None, &now).await?;
            }
            Err(error) => {
                let text = error.to_string();
                tracing::warn!(action_id = %action_id, error = %text, "Action failed");
                self.finish(&start, &action_id, Some(&text), &now).await?;
            }
        }
        Ok(())
    }

    async fn execute(&self, requested_kind: &str, desired: usize) -> anyhow::Result<()> {
        if !requested_kind.eq_ignore_ascii_case(action_kind::SCALE_DOCKER) {
            anyhow::bail!("unsupported action kind: {requested_kind}");
        }
        converge(self.runtime.as_ref(), &self.runner_id, desired).await?;
        Ok(())
    }

    async fn finish(
        &self,
        start: &ActionStart,
        action_id: &str,
        error: Option<&str>,
        now: &str,
    ) -> anyhow::Result<()> {
        let (status, event_kind, suffix, topic) = match error {
            None => (
                action_status::COMPLETED,
                kind::ACTION_COMPLETED,
                "completed",
                &self.topic_action_completed,
            ),
            Some(_) => (
                action_status::FAILED,
                kind::ACTION_FAILED,
                "failed",
                &self.topic_action_failed,
            ),
        };

        let result = ActionResult {
            action_id: action_id.to_string(),
            kind: start.kind.clone(),
            desired_replicas: start.desired_replicas,
            alert_fp: start.alert_fp.clone(),
            error: error.map(str::to_string),
            dedup_key: format!("{action_id}:{suffix}"),
            created_at: now.to_string(),
        };
        let event = match error {
            None => Event::ActionCompleted(result),
            Some(_) => Event::ActionFailed(result),
        };
        let payload = event.to_json()?;

        self.store
            .finish_action(action_id, status, error, event_kind, &payload, now)
            .await?;
        self.publisher.publish(topic, payload.as_bytes()).await;
        Ok(())
    }

    /// Consumer loop: read, process, commit the offset only on success.
    pub async fn run(&self, consumer: StreamConsumer) {
        loop {
            match consumer.recv().await {
                Err(error) => {
                    tracing::warn!(error = %error, "Broker read failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Ok(message) => {
                    let payload = message.payload().unwrap_or_default();
                    match self.process(payload).await {
                        Ok(()) => {
                            if let Err(error) = consumer.commit_message(&message, CommitMode::Async)
                            {
                                tracing::warn!(error = %error, "Offset commit failed");
                            }
                        }
                        Err(error) => {
                            tracing::error!(
                                error = %error,
                                "Action processing failed, leaving offset for redelivery"
                            );
                        }
                    }
                }
            }
        }
    }
}
