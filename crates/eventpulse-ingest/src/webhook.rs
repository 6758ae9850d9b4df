use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use eventpulse_common::time::now_rfc3339;
use eventpulse_common::types::{alert_raised_dedup_key, AlertRaised, AlertmanagerWebhook, Event};
use eventpulse_storage::AlertUpsert;

use crate::state::AppState;

/// `POST /alertmanager`.
///
/// One transaction covers the whole batch: alert upserts plus one
/// `alert.raised` outbox row per alert. Publication to the broker happens
/// after commit and is fire-and-forget.
pub async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let webhook: AlertmanagerWebhook = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!(error = %error, "Malformed webhook body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let now = now_rfc3339();
    let mut batch = Vec::with_capacity(webhook.alerts.len());
    for alert in &webhook.alerts {
        let event = Event::AlertRaised(AlertRaised {
            fingerprint: alert.fingerprint.clone(),
            status: alert.status.clone(),
            labels: alert.labels.clone(),
            annotations: alert.annotations.clone(),
            dedup_key: alert_raised_dedup_key(&alert.fingerprint, &alert.status),
            created_at: now.clone(),
        });
        let payload = match event.to_json() {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(error = %error, "Failed to encode alert.raised event");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        batch.push(AlertUpsert {
            fingerprint: alert.fingerprint.clone(),
            status: alert.status.clone(),
            labels_json: serde_json::to_string(&alert.labels).unwrap_or_else(|_| "{}".into()),
            annotations_json: serde_json::to_string(&alert.annotations)
                .unwrap_or_else(|_| "{}".into()),
            starts_at: alert.starts_at.clone(),
            ends_at: alert.ends_at.clone(),
            event_payload: payload,
        });
    }

    if let Err(error) = state.store.record_batch(&batch, &now).await {
        tracing::error!(error = %error, "Webhook persistence failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    for item in &batch {
        state
            .publisher
            .publish(&state.topic_alert_raised, item.event_payload.as_bytes())
            .await;
    }

    (StatusCode::OK, "ok").into_response()
}
