use std::sync::Arc;
use std::time::Duration;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;

use eventpulse_common::id;
use eventpulse_common::time::now_rfc3339;
use eventpulse_common::types::{Envelope, Event};
use eventpulse_storage::store::incident::{ActionOutcome, Projection};
use eventpulse_storage::{action_status, incident_status, IncidentStore};

/// Applies one consumed event to the projection.
///
/// The envelope is peeked first so that even unknown event kinds pass
/// through inbox dedup before being ignored. Raw payload bytes are what
/// get preserved on the incident timeline.
pub async fn process_message(store: &IncidentStore, payload: &[u8]) -> anyhow::Result<()> {
    let envelope = match Envelope::peek(payload) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(error = %error, "Dropping undecodable message");
            return Ok(());
        }
    };

    let dedup_key = if envelope.dedup_key.is_empty() {
        id::fallback_dedup_key()
    } else {
        envelope.dedup_key.clone()
    };
    let now = now_rfc3339();
    let raw = String::from_utf8_lossy(payload).into_owned();

    let event = Event::parse(payload).ok();
    let projection = match &event {
        Some(Event::IncidentOpened(opened)) if !opened.alert_fp.is_empty() => Projection::Opened {
            alert_fp: &opened.alert_fp,
        },
        Some(Event::IncidentOpened(_)) => {
            // Nothing to correlate without a fingerprint.
            Projection::Ignore
        }
        Some(Event::ActionCompleted(result)) => Projection::Outcome(ActionOutcome {
            alert_fp: &result.alert_fp,
            action_id: &result.action_id,
            kind: &result.kind,
            desired_replicas: result.desired_replicas,
            error: None,
            incident_status: incident_status::RESOLVED,
            action_status: action_status::COMPLETED,
        }),
        Some(Event::ActionFailed(result)) => Projection::Outcome(ActionOutcome {
            alert_fp: &result.alert_fp,
            action_id: &result.action_id,
            kind: &result.kind,
            desired_replicas: result.desired_replicas,
            error: result.error.as_deref(),
            incident_status: incident_status::FAILED,
            action_status: action_status::FAILED,
        }),
        _ => {
            tracing::debug!(kind = %envelope.kind, "Ignoring unhandled event kind");
            Projection::Ignore
        }
    };

    store
        .apply(&dedup_key, &envelope.kind, &raw, projection, &now)
        .await?;
    Ok(())
}

/// Consumer loop over the incident/action fan-in topics.
pub async fn run_consumer(store: Arc<IncidentStore>, consumer: StreamConsumer) {
    loop {
        match consumer.recv().await {
            Err(error) => {
                tracing::warn!(error = %error, "Broker read failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(message) => {
                let payload = message.payload().unwrap_or_default();
                match process_message(&store, payload).await {
                    Ok(()) => {
                        if let Err(error) = consumer.commit_message(&message, CommitMode::Async) {
                            tracing::warn!(error = %error, "Offset commit failed");
                        }
                    }
                    Err(error) => {
                        tracing::error!(
                            error = %error,
                            "Projection failed, leaving offset for redelivery"
                        );
                    }
                }
            }
        }
    }
}
