//! Runner health supervisor.
//!
//! A probe FSM per runner service: consecutive failures count up to the
//! threshold, an emission fires at the threshold subject to a cooldown,
//! and the first healthy probe resets the counter. The cooldown is a
//! timestamp comparison, so a supervisor restart at worst re-emits once.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use eventpulse_broker::Publisher;
use eventpulse_common::id;
use eventpulse_common::time::now_rfc3339;
use eventpulse_common::types::{action_kind, ActionRequested, Event, IncidentOpened};
use eventpulse_storage::{OutboxEntry, RuleStore};

use crate::config::SupervisorConfig;

/// Probe timeout; a slow health endpoint counts as a failure.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Per-service probe state: `(fail_count, last_emitted)`.
#[derive(Debug, Default)]
pub struct ProbeState {
    fail_count: u32,
    last_emitted: Option<DateTime<Utc>>,
}

impl ProbeState {
    /// Feeds one probe outcome; returns true when an outage emission is
    /// due. The counter clamps at the threshold while unhealthy and resets
    /// on the first success.
    pub fn observe(
        &mut self,
        healthy: bool,
        threshold: u32,
        cooldown: chrono::Duration,
        now: DateTime<Utc>,
    ) -> bool {
        if healthy {
            self.fail_count = 0;
            return false;
        }
        self.fail_count = (self.fail_count + 1).min(threshold);
        if self.fail_count < threshold {
            return false;
        }
        if let Some(last) = self.last_emitted {
            if now - last < cooldown {
                return false;
            }
        }
        self.last_emitted = Some(now);
        true
    }
}

pub struct Supervisor {
    store: Arc<RuleStore>,
    publisher: Arc<Publisher>,
    topic_incident_opened: String,
    topic_action_requested: String,
    services: Vec<String>,
    check_interval: Duration,
    fail_threshold: u32,
    cooldown: chrono::Duration,
    client: reqwest::Client,
    states: HashMap<String, ProbeState>,
}

impl Supervisor {
    pub fn new(
        config: &SupervisorConfig,
        store: Arc<RuleStore>,
        publisher: Arc<Publisher>,
        topic_incident_opened: String,
        topic_action_requested: String,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self {
            store,
            publisher,
            topic_incident_opened,
            topic_action_requested,
            services: config.services.clone(),
            check_interval: config.check_interval,
            fail_threshold: config.fail_threshold,
            cooldown: chrono::Duration::from_std(config.cooldown)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            client,
            states: HashMap::new(),
        })
    }

    pub async fn run(mut self) {
        tracing::info!(
            services = ?self.services,
            interval = ?self.check_interval,
            threshold = self.fail_threshold,
            "Runner supervisor started"
        );
        let mut tick = tokio::time::interval(self.check_interval);
        loop {
            tick.tick().await;
            self.sweep().await;
        }
    }

    async fn sweep(&mut self) {
        for service in self.services.clone() {
            let healthy = self.probe(&service).await;
            let due = self
                .states
                .entry(service.clone())
                .or_default()
                .observe(healthy, self.fail_threshold, self.cooldown, Utc::now());
            if due {
                if let Err(error) = self.emit_outage(&service).await {
                    tracing::error!(service = %service, error = %error, "Outage emission failed");
                }
            }
        }
    }

    async fn probe(&self, service: &str) -> bool {
        let url = format!("http://{service}:8092/health");
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Emits `incident.opened` + `action.requested(restart_runner)` for a
    /// declared-unhealthy service, through the same outbox and publisher
    /// as the regular decision path.
    async fn emit_outage(&self, service: &str) -> anyhow::Result<()> {
        let now = now_rfc3339();
        let alert_fp = format!("outage({service})");
        let incident_id = id::incident_id();
        let action_id = id::action_id();

        let incident = Event::IncidentOpened(IncidentOpened {
            alert_fp: alert_fp.clone(),
            incident_id: incident_id.clone(),
            dedup_key: incident_id.clone(),
            created_at: now.clone(),
        });
        let action = Event::ActionRequested(ActionRequested {
            alert_fp,
            kind: action_kind::RESTART_RUNNER.to_string(),
            desired_replicas: None,
            action_id: action_id.clone(),
            target_runner: Some(service.to_string()),
            dedup_key: action_id.clone(),
            created_at: now.clone(),
        });

        let entries = vec![
            OutboxEntry {
                kind: incident.kind().to_string(),
                payload: incident.to_json()?,
            },
            OutboxEntry {
                kind: action.kind().to_string(),
                payload: action.to_json()?,
            },
        ];
        let log_line =
            format!("outage({service}) -> incident {incident_id}, restart_runner {action_id}");
        self.store.record_emission(&log_line, &entries, &now).await?;

        tracing::warn!(
            service = %service,
            incident_id = %incident_id,
            action_id = %action_id,
            "Runner unhealthy, emitted outage incident and restart action"
        );

        self.publisher
            .publish(&self.topic_incident_opened, entries[0].payload.as_bytes())
            .await;
        self.publisher
            .publish(&self.topic_action_requested, entries[1].payload.as_bytes())
            .await;
        Ok(())
    }
}
