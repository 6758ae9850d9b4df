use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event kind discriminators as they appear on the wire and in outbox rows.
pub mod kind {
    pub const ALERT_RAISED: &str = "alert.raised";
    pub const INCIDENT_OPENED: &str = "incident.opened";
    pub const ACTION_REQUESTED: &str = "action.requested";
    pub const ACTION_COMPLETED: &str = "action.completed";
    pub const ACTION_FAILED: &str = "action.failed";
}

/// Action kinds understood by the pipeline. The runner executes
/// `scale_docker`; everything else terminates as an unsupported kind.
pub mod action_kind {
    pub const SCALE_DOCKER: &str = "scale_docker";
    pub const RESTART_RUNNER: &str = "restart_runner";
}

/// Minimal view of an event payload: just enough to dedup and dispatch.
///
/// Consumers peek the envelope first so that even events of unknown type
/// pass through inbox dedup before being dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub dedup_key: String,
    #[serde(default)]
    pub created_at: String,
}

impl Envelope {
    pub fn peek(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Full event envelope, discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "alert.raised")]
    AlertRaised(AlertRaised),
    #[serde(rename = "incident.opened")]
    IncidentOpened(IncidentOpened),
    #[serde(rename = "action.requested")]
    ActionRequested(ActionRequested),
    #[serde(rename = "action.completed")]
    ActionCompleted(ActionResult),
    #[serde(rename = "action.failed")]
    ActionFailed(ActionResult),
}

impl Event {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AlertRaised(_) => kind::ALERT_RAISED,
            Event::IncidentOpened(_) => kind::INCIDENT_OPENED,
            Event::ActionRequested(_) => kind::ACTION_REQUESTED,
            Event::ActionCompleted(_) => kind::ACTION_COMPLETED,
            Event::ActionFailed(_) => kind::ACTION_FAILED,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One alert observation, as enqueued by Ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRaised {
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub dedup_key: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentOpened {
    #[serde(default)]
    pub alert_fp: String,
    pub incident_id: String,
    #[serde(default)]
    pub dedup_key: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequested {
    #[serde(default)]
    pub alert_fp: String,
    pub kind: String,
    /// Absent for kinds that do not scale anything (`restart_runner`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_replicas: Option<i32>,
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_runner: Option<String>,
    #[serde(default)]
    pub dedup_key: String,
    #[serde(default)]
    pub created_at: String,
}

/// Shared shape of `action.completed` and `action.failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub desired_replicas: i32,
    #[serde(default)]
    pub alert_fp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub dedup_key: String,
    #[serde(default)]
    pub created_at: String,
}

/// Alertmanager webhook body (`POST /alertmanager`).
#[derive(Debug, Clone, Deserialize)]
pub struct AlertmanagerWebhook {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alerts: Vec<AlertmanagerAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertmanagerAlert {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default, rename = "startsAt")]
    pub starts_at: String,
    #[serde(default, rename = "endsAt")]
    pub ends_at: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// Dedup key for an `alert.raised` observation:
/// `<fingerprint>:alert.raised:<status>`.
///
/// A missing fingerprint degenerates to `:alert.raised:<status>`; such
/// alerts are still persisted and forwarded.
pub fn alert_raised_dedup_key(fingerprint: &str, status: &str) -> String {
    format!("{fingerprint}:{}:{status}", kind::ALERT_RAISED)
}
