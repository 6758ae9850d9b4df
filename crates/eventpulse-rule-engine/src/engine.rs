use std::sync::Arc;
use std::time::Duration;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;

use eventpulse_broker::Publisher;
use eventpulse_common::id;
use eventpulse_common::time::now_rfc3339;
use eventpulse_common::types::Event;
use eventpulse_storage::{OutboxEntry, RuleStore};

use crate::decision;

/// The consuming half of the rule engine.
pub struct RuleEngine {
    store: Arc<RuleStore>,
    publisher: Arc<Publisher>,
    topic_incident_opened: String,
    topic_action_requested: String,
}

impl RuleEngine {
    pub fn new(
        store: Arc<RuleStore>,
        publisher: Arc<Publisher>,
        topic_incident_opened: String,
        topic_action_requested: String,
    ) -> Self {
        Self {
            store,
            publisher,
            topic_incident_opened,
            topic_action_requested,
        }
    }

    /// Handles one consumed message end to end.
    ///
    /// Returns `Ok` for everything that must advance the offset, including
    /// protocol garbage and duplicates; only storage failures bubble up so
    /// the message is retried via redelivery.
    pub async fn process_alert(&self, payload: &[u8]) -> anyhow::Result<()> {
        let alert = match Event::parse(payload) {
            Ok(Event::AlertRaised(alert)) => alert,
            Ok(other) => {
                tracing::debug!(kind = other.kind(), "Ignoring non-alert event");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(error = %error, "Dropping undecodable message");
                return Ok(());
            }
        };

        let now = now_rfc3339();
        let dedup_key = if alert.dedup_key.is_empty() {
            id::fallback_dedup_key()
        } else {
            alert.dedup_key.clone()
        };

        // Every consumed alert claims its inbox row, classified or not.
        let Some(decision) = decision::decide(&alert, &now) else {
            if self
                .store
                .mark_processed(&dedup_key, &now)
                .await?
                .is_duplicate()
            {
                tracing::debug!(dedup_key = %dedup_key, "Duplicate alert delivery, skipping");
            } else {
                tracing::debug!(status = %alert.status, "No rule matched, dropping");
            }
            return Ok(());
        };

        let mut entries = Vec::with_capacity(decision.events.len());
        for event in &decision.events {
            entries.push(OutboxEntry {
                kind: event.kind().to_string(),
                payload: event.to_json()?,
            });
        }

        if self
            .store
            .commit_decision(&dedup_key, &decision.log_line, &entries, &now)
            .await?
            .is_duplicate()
        {
            tracing::debug!(dedup_key = %dedup_key, "Duplicate alert delivery, skipping");
            return Ok(());
        }

        tracing::info!(
            fingerprint = %alert.fingerprint,
            status = %alert.status,
            decision = %decision.log_line,
            "Decision committed"
        );

        for (event, entry) in decision.events.iter().zip(&entries) {
            self.publisher
                .publish(self.topic_for(event), entry.payload.as_bytes())
                .await;
        }
        Ok(())
    }

    fn topic_for(&self, event: &Event) -> &str {
        match event {
            Event::IncidentOpened(_) => &self.topic_incident_opened,
            _ => &self.topic_action_requested,
        }
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
                    match self.process_alert(payload).await {
                        Ok(()) => {
                            if let Err(error) = consumer.commit_message(&message, CommitMode::Async)
                            {
                                tracing::warn!(error = %error, "Offset commit failed");
                            }
                        }
                        Err(error) => {
                            tracing::error!(
                                error = %error,
                                "Alert processing failed, leaving offset for redelivery"
                            );
                        }
                    }
                }
            }
        }
    }
}
