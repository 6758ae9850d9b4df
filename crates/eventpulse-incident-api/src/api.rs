use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use eventpulse_storage::entities::incident;
use eventpulse_storage::IncidentDetail;

use crate::state::ApiState;

/// Cap on `GET /incidents`.
const LIST_LIMIT: u64 = 200;

#[derive(Serialize, ToSchema)]
pub struct IncidentSummary {
    pub incident_id: String,
    pub alert_fp: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, ToSchema)]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// The raw event envelope, embedded as JSON.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: String,
}

#[derive(Serialize, ToSchema)]
pub struct TimelineAction {
    pub action_id: String,
    pub kind: String,
    pub desired_replicas: i32,
    pub status: String,
    pub error: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, ToSchema)]
pub struct IncidentResponse {
    pub incident_id: String,
    pub alert_fp: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub events: Vec<TimelineEvent>,
    pub actions: Vec<TimelineAction>,
}

fn summary(row: incident::Model) -> IncidentSummary {
    IncidentSummary {
        incident_id: row.incident_id,
        alert_fp: row.alert_fp,
        status: row.status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn detail(found: IncidentDetail) -> IncidentResponse {
    let events = found
        .events
        .into_iter()
        .map(|event| TimelineEvent {
            kind: event.kind,
            payload: serde_json::from_str(&event.payload)
                .unwrap_or(serde_json::Value::Null),
            created_at: event.created_at,
        })
        .collect();
    let actions = found
        .actions
        .into_iter()
        .map(|action| TimelineAction {
            action_id: action.action_id,
            kind: action.kind,
            desired_replicas: action.desired_replicas,
            status: action.status,
            error: action.error.unwrap_or_default(),
            created_at: action.created_at,
            updated_at: action.updated_at,
        })
        .collect();

    IncidentResponse {
        incident_id: found.incident.incident_id,
        alert_fp: found.incident.alert_fp,
        status: found.incident.status,
        created_at: found.incident.created_at,
        updated_at: found.incident.updated_at,
        events,
        actions,
    }
}

/// The 200 most recent incidents, newest first.
#[utoipa::path(
    get,
    path = "/incidents",
    tag = "Incidents",
    responses(
        (status = 200, description = "Most recent incidents, newest first", body = [IncidentSummary]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_incidents(State(state): State<ApiState>) -> Response {
    match state.store.list_incidents(LIST_LIMIT).await {
        Ok(rows) => Json(rows.into_iter().map(summary).collect::<Vec<_>>()).into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Failed to list incidents");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// One incident with its ordered timeline and actions.
#[utoipa::path(
    get,
    path = "/incidents/{id}",
    tag = "Incidents",
    params(("id" = String, Path, description = "Incident id")),
    responses(
        (status = 200, description = "The incident with events and actions", body = IncidentResponse),
        (status = 404, description = "Unknown incident id"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn get_incident(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.store.get_incident(&id).await {
        Ok(Some(found)) => Json(detail(found)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(error = %error, incident_id = %id, "Failed to load incident");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve"),
        (status = 503, description = "Still starting")
    )
)]
pub async fn ready(State(state): State<ApiState>) -> Response {
    if state.ready {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
    }
}
