use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use migration::{MigratorTrait, RulesMigrator};

use crate::store::incident::{ActionOutcome, Projection};
use crate::{
    action_status, incident_status, protocol, ActionStart, AlertUpsert, DedupOutcome,
    IncidentStore, IngestStore, OutboxEntry, RuleStore, RunnerStore,
};

// A single pooled connection keeps the in-memory database alive for the
// whole test.
fn mem_options() -> ConnectOptions {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    options
}

async fn ingest_store() -> IngestStore {
    IngestStore::connect_with(mem_options()).await.unwrap()
}

async fn rule_store() -> RuleStore {
    RuleStore::connect_with(mem_options()).await.unwrap()
}

async fn runner_store() -> RunnerStore {
    RunnerStore::connect_with(mem_options()).await.unwrap()
}

async fn incident_store() -> IncidentStore {
    IncidentStore::connect_with(mem_options()).await.unwrap()
}

fn upsert(fingerprint: &str, status: &str) -> AlertUpsert {
    AlertUpsert {
        fingerprint: fingerprint.to_string(),
        status: status.to_string(),
        labels_json: "{}".to_string(),
        annotations_json: "{}".to_string(),
        starts_at: "2025-01-01T00:00:00Z".to_string(),
        ends_at: String::new(),
        event_payload: format!(r#"{{"type":"alert.raised","fingerprint":"{fingerprint}"}}"#),
    }
}

#[tokio::test]
async fn inbox_claims_each_key_once() {
    let db: DatabaseConnection = Database::connect(mem_options()).await.unwrap();
    RulesMigrator::up(&db, None).await.unwrap();

    let first = protocol::insert_inbox(&db, "fp1:alert.raised:firing", "t1")
        .await
        .unwrap();
    let second = protocol::insert_inbox(&db, "fp1:alert.raised:firing", "t2")
        .await
        .unwrap();

    assert_eq!(first, DedupOutcome::Fresh);
    assert_eq!(second, DedupOutcome::Duplicate);
    assert_eq!(protocol::list_inbox(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ingest_first_observation_inserts() {
    let store = ingest_store().await;
    store.record_batch(&[upsert("fp1", "firing")], "t1").await.unwrap();

    let row = store.get_alert("fp1").await.unwrap().unwrap();
    assert_eq!(row.status, "firing");
    assert_eq!(row.occurrences, 1);
    assert_eq!(row.first_seen, "t1");
    assert_eq!(row.last_seen, "t1");
}

#[tokio::test]
async fn ingest_reobservation_bumps_occurrences() {
    let store = ingest_store().await;
    store.record_batch(&[upsert("fp1", "firing")], "t1").await.unwrap();
    store.record_batch(&[upsert("fp1", "resolved")], "t2").await.unwrap();

    let row = store.get_alert("fp1").await.unwrap().unwrap();
    assert_eq!(row.status, "resolved");
    assert_eq!(row.occurrences, 2);
    assert_eq!(row.first_seen, "t1");
    assert_eq!(row.last_seen, "t2");
}

#[tokio::test]
async fn ingest_enqueues_one_outbox_row_per_observation() {
    let store = ingest_store().await;
    store
        .record_batch(&[upsert("fp1", "firing"), upsert("fp2", "firing")], "t1")
        .await
        .unwrap();

    let outbox = store.list_outbox().await.unwrap();
    assert_eq!(outbox.len(), 2);
    assert!(outbox.iter().all(|row| row.kind == "alert.raised"));
    assert!(outbox[0].payload.contains("fp1"));
    assert!(outbox[1].payload.contains("fp2"));
}

#[tokio::test]
async fn rule_decision_commits_once_per_dedup_key() {
    let store = rule_store().await;
    let entries = vec![
        OutboxEntry {
            kind: "incident.opened".to_string(),
            payload: r#"{"type":"incident.opened"}"#.to_string(),
        },
        OutboxEntry {
            kind: "action.requested".to_string(),
            payload: r#"{"type":"action.requested"}"#.to_string(),
        },
    ];

    let first = store
        .commit_decision("fp1:alert.raised:firing", "firing(fp1)", &entries, "t1")
        .await
        .unwrap();
    let second = store
        .commit_decision("fp1:alert.raised:firing", "firing(fp1)", &entries, "t2")
        .await
        .unwrap();

    assert_eq!(first, DedupOutcome::Fresh);
    assert_eq!(second, DedupOutcome::Duplicate);
    assert_eq!(store.list_decisions().await.unwrap().len(), 1);
    assert_eq!(store.list_outbox().await.unwrap().len(), 2);
}

#[tokio::test]
async fn rule_duplicate_rolls_back_everything() {
    let store = rule_store().await;
    let entry = vec![OutboxEntry {
        kind: "action.requested".to_string(),
        payload: "{}".to_string(),
    }];
    store.commit_decision("k1", "d1", &entry, "t1").await.unwrap();
    store.commit_decision("k1", "d2", &entry, "t2").await.unwrap();

    // The duplicate attempt must not leave a second decision or outbox row.
    let decisions = store.list_decisions().await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].decision, "d1");
    assert_eq!(store.list_outbox().await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_processed_claims_without_side_effects() {
    let store = rule_store().await;

    let first = store.mark_processed("fp1:alert.raised:pending", "t1").await.unwrap();
    let second = store.mark_processed("fp1:alert.raised:pending", "t2").await.unwrap();

    assert_eq!(first, DedupOutcome::Fresh);
    assert_eq!(second, DedupOutcome::Duplicate);
    assert!(store.list_decisions().await.unwrap().is_empty());
    assert!(store.list_outbox().await.unwrap().is_empty());
}

#[tokio::test]
async fn supervisor_emission_skips_the_inbox() {
    let store = rule_store().await;
    let entry = vec![OutboxEntry {
        kind: "incident.opened".to_string(),
        payload: "{}".to_string(),
    }];
    store.record_emission("outage(a)", &entry, "t1").await.unwrap();
    store.record_emission("outage(a)", &entry, "t2").await.unwrap();

    assert_eq!(store.list_decisions().await.unwrap().len(), 2);
    assert_eq!(store.list_outbox().await.unwrap().len(), 2);
}

#[tokio::test]
async fn runner_redelivery_short_circuits() {
    let store = runner_store().await;
    let start = ActionStart {
        action_id: "act-1".to_string(),
        kind: "scale_docker".to_string(),
        desired_replicas: 2,
        alert_fp: "fp1".to_string(),
    };

    assert_eq!(
        store.begin_action("act-1", &start, "t1").await.unwrap(),
        DedupOutcome::Fresh
    );
    assert_eq!(
        store.begin_action("act-1", &start, "t2").await.unwrap(),
        DedupOutcome::Duplicate
    );

    let row = store.get_action("act-1").await.unwrap().unwrap();
    assert_eq!(row.status, action_status::RUNNING);
    assert_eq!(row.created_at, "t1");
}

#[tokio::test]
async fn runner_action_moves_forward_to_completed() {
    let store = runner_store().await;
    let start = ActionStart {
        action_id: "act-1".to_string(),
        kind: "scale_docker".to_string(),
        desired_replicas: 2,
        alert_fp: "fp1".to_string(),
    };
    store.begin_action("act-1", &start, "t1").await.unwrap();
    store
        .finish_action(
            "act-1",
            action_status::COMPLETED,
            None,
            "action.completed",
            r#"{"type":"action.completed","action_id":"act-1"}"#,
            "t2",
        )
        .await
        .unwrap();

    let row = store.get_action("act-1").await.unwrap().unwrap();
    assert_eq!(row.status, action_status::COMPLETED);
    assert_eq!(row.error, None);
    assert_eq!(row.updated_at, "t2");

    let outbox = store.list_outbox().await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].kind, "action.completed");
}

#[tokio::test]
async fn runner_failure_records_the_error() {
    let store = runner_store().await;
    let start = ActionStart {
        action_id: "act-2".to_string(),
        kind: "scale_k8s".to_string(),
        desired_replicas: 1,
        alert_fp: "fp1".to_string(),
    };
    store.begin_action("act-2", &start, "t1").await.unwrap();
    store
        .finish_action(
            "act-2",
            action_status::FAILED,
            Some("unsupported action kind: scale_k8s"),
            "action.failed",
            "{}",
            "t2",
        )
        .await
        .unwrap();

    let row = store.get_action("act-2").await.unwrap().unwrap();
    assert_eq!(row.status, action_status::FAILED);
    assert_eq!(
        row.error.as_deref(),
        Some("unsupported action kind: scale_k8s")
    );
}

#[tokio::test]
async fn projector_opens_then_rebinds_same_incident() {
    let store = incident_store().await;
    store
        .apply("inc-a", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t1")
        .await
        .unwrap();
    store
        .apply("inc-b", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t2")
        .await
        .unwrap();

    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents.len(), 1, "open incident must be reused");
    assert_eq!(incidents[0].status, incident_status::OPEN);

    let detail = store
        .get_incident(&incidents[0].incident_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.events.len(), 2);
}

#[tokio::test]
async fn projector_resolves_newest_incident_for_fingerprint() {
    let store = incident_store().await;
    store
        .apply("inc-a", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t1")
        .await
        .unwrap();
    store
        .apply(
            "act-1:completed",
            "action.completed",
            r#"{"type":"action.completed"}"#,
            Projection::Outcome(ActionOutcome {
                alert_fp: "fp1",
                action_id: "act-1",
                kind: "scale_docker",
                desired_replicas: 2,
                error: None,
                incident_status: incident_status::RESOLVED,
                action_status: action_status::COMPLETED,
            }),
            "t2",
        )
        .await
        .unwrap();

    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].status, incident_status::RESOLVED);

    let detail = store
        .get_incident(&incidents[0].incident_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.events.len(), 2);
    assert_eq!(detail.actions.len(), 1);
    assert_eq!(detail.actions[0].status, action_status::COMPLETED);
    assert_eq!(detail.actions[0].desired_replicas, 2);
}

#[tokio::test]
async fn projector_failure_marks_incident_failed() {
    let store = incident_store().await;
    store
        .apply("inc-a", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t1")
        .await
        .unwrap();
    store
        .apply(
            "act-1:failed",
            "action.failed",
            "{}",
            Projection::Outcome(ActionOutcome {
                alert_fp: "fp1",
                action_id: "act-1",
                kind: "scale_k8s",
                desired_replicas: 0,
                error: Some("unsupported action kind: scale_k8s"),
                incident_status: incident_status::FAILED,
                action_status: action_status::FAILED,
            }),
            "t2",
        )
        .await
        .unwrap();

    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents[0].status, incident_status::FAILED);
    let action = store.get_action("act-1").await.unwrap().unwrap();
    assert_eq!(
        action.error.as_deref(),
        Some("unsupported action kind: scale_k8s")
    );
}

#[tokio::test]
async fn projector_tolerates_result_before_open() {
    let store = incident_store().await;
    store
        .apply(
            "act-1:completed",
            "action.completed",
            "{}",
            Projection::Outcome(ActionOutcome {
                alert_fp: "fp2",
                action_id: "act-1",
                kind: "scale_docker",
                desired_replicas: 2,
                error: None,
                incident_status: incident_status::RESOLVED,
                action_status: action_status::COMPLETED,
            }),
            "t1",
        )
        .await
        .unwrap();

    // No incident is fabricated, but the action row is kept, unbound.
    assert!(store.list_incidents(200).await.unwrap().is_empty());
    let action = store.get_action("act-1").await.unwrap().unwrap();
    assert_eq!(action.incident_id, None);
    assert_eq!(action.status, action_status::COMPLETED);

    // A later open creates a fresh incident, untouched by the old result.
    store
        .apply("inc-a", "incident.opened", "{}", Projection::Opened { alert_fp: "fp2" }, "t2")
        .await
        .unwrap();
    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].status, incident_status::OPEN);
}

#[tokio::test]
async fn projector_duplicate_event_changes_nothing() {
    let store = incident_store().await;
    for now in ["t1", "t2"] {
        store
            .apply(
                "inc-a",
                "incident.opened",
                "{}",
                Projection::Opened { alert_fp: "fp1" },
                now,
            )
            .await
            .unwrap();
    }

    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].updated_at, "t1");
    let detail = store
        .get_incident(&incidents[0].incident_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.events.len(), 1);
}

#[tokio::test]
async fn projector_keeps_at_most_one_active_incident_per_fingerprint() {
    let store = incident_store().await;
    store
        .apply("inc-a", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t1")
        .await
        .unwrap();
    store
        .apply(
            "act-1:completed",
            "action.completed",
            "{}",
            Projection::Outcome(ActionOutcome {
                alert_fp: "fp1",
                action_id: "act-1",
                kind: "scale_docker",
                desired_replicas: 2,
                error: None,
                incident_status: incident_status::RESOLVED,
                action_status: action_status::COMPLETED,
            }),
            "t2",
        )
        .await
        .unwrap();
    // With the first incident resolved, a new alert opens a second one.
    store
        .apply("inc-b", "incident.opened", "{}", Projection::Opened { alert_fp: "fp1" }, "t3")
        .await
        .unwrap();

    let incidents = store.list_incidents(200).await.unwrap();
    assert_eq!(incidents.len(), 2);
    let active = incidents
        .iter()
        .filter(|i| {
            i.status == incident_status::OPEN || i.status == incident_status::MITIGATING
        })
        .count();
    assert_eq!(active, 1);
    // Newest first.
    assert_eq!(incidents[0].status, incident_status::OPEN);
    assert_eq!(incidents[1].status, incident_status::RESOLVED);
}

#[tokio::test]
async fn projector_ignores_unknown_kinds_after_dedup() {
    let store = incident_store().await;
    let first = store
        .apply("weird-1", "alert.snoozed", "{}", Projection::Ignore, "t1")
        .await
        .unwrap();
    let second = store
        .apply("weird-1", "alert.snoozed", "{}", Projection::Ignore, "t2")
        .await
        .unwrap();

    assert_eq!(first, DedupOutcome::Fresh);
    assert_eq!(second, DedupOutcome::Duplicate);
    assert!(store.list_incidents(200).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_incidents_honors_the_limit() {
    let store = incident_store().await;
    for i in 0..5 {
        store
            .apply(
                &format!("inc-{i}"),
                "incident.opened",
                "{}",
                Projection::Opened {
                    alert_fp: &format!("fp{i}"),
                },
                "t1",
            )
            .await
            .unwrap();
    }

    let incidents = store.list_incidents(3).await.unwrap();
    assert_eq!(incidents.len(), 3);
    assert_eq!(incidents[0].alert_fp, "fp4");
}
