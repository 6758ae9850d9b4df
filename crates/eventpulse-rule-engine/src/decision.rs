//! The decision rules, kept pure so they are trivially testable.

use eventpulse_common::id;
use eventpulse_common::types::{action_kind, ActionRequested, AlertRaised, Event, IncidentOpened};

/// Replica target while an alert is firing.
const FIRING_REPLICAS: i32 = 2;
/// Replica target once it resolves.
const RESOLVED_REPLICAS: i32 = 1;

/// Outcome of classifying one alert: a rendered decision line for the
/// decision log plus the events to emit.
#[derive(Debug)]
pub struct Decision {
    pub log_line: String,
    pub events: Vec<Event>,
}

/// Classifies an alert by status.
///
/// `firing` opens an incident and requests a scale-out; `resolved`
/// requests a scale-in; anything else is dropped. Every decision mints
/// fresh incident/action ids, which double as the emitted events' dedup
/// keys.
pub fn decide(alert: &AlertRaised, now: &str) -> Option<Decision> {
    match alert.status.as_str() {
        "firing" => {
            let incident_id = id::incident_id();
            let action_id = id::action_id();
            let log_line = format!(
                "firing({}) -> incident {incident_id}, scale_docker({FIRING_REPLICAS}) {action_id}",
                alert.fingerprint
            );
            Some(Decision {
                log_line,
                events: vec![
                    Event::IncidentOpened(IncidentOpened {
                        alert_fp: alert.fingerprint.clone(),
                        incident_id: incident_id.clone(),
                        dedup_key: incident_id,
                        created_at: now.to_string(),
                    }),
                    scale_request(alert, FIRING_REPLICAS, action_id, now),
                ],
            })
        }
        "resolved" => {
            let action_id = id::action_id();
            let log_line = format!(
                "resolved({}) -> scale_docker({RESOLVED_REPLICAS}) {action_id}",
                alert.fingerprint
            );
            Some(Decision {
                log_line,
                events: vec![scale_request(alert, RESOLVED_REPLICAS, action_id, now)],
            })
        }
        _ => None,
    }
}

fn scale_request(alert: &AlertRaised, replicas: i32, action_id: String, now: &str) -> Event {
    Event::ActionRequested(ActionRequested {
        alert_fp: alert.fingerprint.clone(),
        kind: action_kind::SCALE_DOCKER.to_string(),
        desired_replicas: Some(replicas),
        action_id: action_id.clone(),
        target_runner: None,
        dedup_key: action_id,
        created_at: now.to_string(),
    })
}
