use eventpulse_common::id;
use migration::{IncidentMigrator, MigratorTrait};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectOptions, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use crate::entities::{incident, incident_action, incident_event};
use crate::{incident_status, protocol, DedupOutcome, Result};

/// A terminal action result to fold into the projection.
#[derive(Debug, Clone)]
pub struct ActionOutcome<'a> {
    pub alert_fp: &'a str,
    pub action_id: &'a str,
    pub kind: &'a str,
    pub desired_replicas: i32,
    pub error: Option<&'a str>,
    /// Status the bound incident moves to (`resolved` or `failed`).
    pub incident_status: &'a str,
    /// Status recorded on the action row (`completed` or `failed`).
    pub action_status: &'a str,
}

/// How one consumed event changes the projection.
#[derive(Debug, Clone)]
pub enum Projection<'a> {
    /// `incident.opened`: bind to the newest open/mitigating incident for
    /// the fingerprint, or create a fresh one.
    Opened { alert_fp: &'a str },
    /// `action.completed` / `action.failed`.
    Outcome(ActionOutcome<'a>),
    /// Unknown or uncorrelatable event: dedup, then drop.
    Ignore,
}

/// An incident with its full ordered timeline.
#[derive(Debug, Clone)]
pub struct IncidentDetail {
    pub incident: incident::Model,
    pub events: Vec<incident_event::Model>,
    pub actions: Vec<incident_action::Model>,
}

/// Store backing the Incident API projector and read surface.
pub struct IncidentStore {
    db: DatabaseConnection,
}

impl IncidentStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(dsn)).await
    }

    pub async fn connect_with(options: ConnectOptions) -> Result<Self> {
        let db = super::connect(options).await?;
        IncidentMigrator::up(&db, None).await?;
        tracing::info!("Incident store ready");
        Ok(Self { db })
    }

    /// Applies one consumed event under inbox dedup, in one transaction.
    ///
    /// Events bind by `alert_fp`, never by position, so the projection
    /// tolerates reordering: a result arriving before its `incident.opened`
    /// leaves an action row with no incident, which is the stable outcome.
    pub async fn apply(
        &self,
        dedup_key: &str,
        event_kind: &str,
        raw_payload: &str,
        projection: Projection<'_>,
        now: &str,
    ) -> Result<DedupOutcome> {
        let txn = self.db.begin().await?;
        if protocol::insert_inbox(&txn, dedup_key, now).await?.is_duplicate() {
            txn.rollback().await?;
            return Ok(DedupOutcome::Duplicate);
        }

        match projection {
            Projection::Ignore => {}
            Projection::Opened { alert_fp } => {
                let current = incident::Entity::find()
                    .filter(incident::Column::AlertFp.eq(alert_fp))
                    .filter(
                        incident::Column::Status
                            .is_in([incident_status::OPEN, incident_status::MITIGATING]),
                    )
                    .order_by_desc(incident::Column::Id)
                    .one(&txn)
                    .await?;

                let incident_id = match current {
                    Some(existing) => {
                        let incident_id = existing.incident_id.clone();
                        let mut am: incident::ActiveModel = existing.into();
                        am.status = Set(incident_status::OPEN.to_string());
                        am.updated_at = Set(now.to_string());
                        am.update(&txn).await?;
                        incident_id
                    }
                    None => {
                        let incident_id = id::incident_id();
                        incident::ActiveModel {
                            incident_id: Set(incident_id.clone()),
                            alert_fp: Set(alert_fp.to_string()),
                            status: Set(incident_status::OPEN.to_string()),
                            created_at: Set(now.to_string()),
                            updated_at: Set(now.to_string()),
                            ..Default::default()
                        }
                        .insert(&txn)
                        .await?;
                        incident_id
                    }
                };

                append_event(&txn, &incident_id, event_kind, raw_payload, now).await?;
            }
            Projection::Outcome(outcome) => {
                let latest = incident::Entity::find()
                    .filter(incident::Column::AlertFp.eq(outcome.alert_fp))
                    .order_by_desc(incident::Column::Id)
                    .one(&txn)
                    .await?;

                let incident_id = match latest {
                    Some(existing) => {
                        let incident_id = existing.incident_id.clone();
                        let mut am: incident::ActiveModel = existing.into();
                        am.status = Set(outcome.incident_status.to_string());
                        am.updated_at = Set(now.to_string());
                        am.update(&txn).await?;
                        append_event(&txn, &incident_id, event_kind, raw_payload, now).await?;
                        Some(incident_id)
                    }
                    None => {
                        tracing::warn!(
                            alert_fp = outcome.alert_fp,
                            action_id = outcome.action_id,
                            "No incident for action result, storing unbound action row"
                        );
                        None
                    }
                };

                incident_action::Entity::insert(incident_action::ActiveModel {
                    action_id: Set(outcome.action_id.to_string()),
                    incident_id: Set(incident_id),
                    kind: Set(outcome.kind.to_string()),
                    desired_replicas: Set(outcome.desired_replicas),
                    status: Set(outcome.action_status.to_string()),
                    error: Set(outcome.error.map(str::to_string)),
                    created_at: Set(now.to_string()),
                    updated_at: Set(now.to_string()),
                    ..Default::default()
                })
                .on_conflict(
                    OnConflict::column(incident_action::Column::ActionId)
                        .update_columns([
                            incident_action::Column::Status,
                            incident_action::Column::Error,
                            incident_action::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(DedupOutcome::Fresh)
    }

    /// Most recent incidents, newest first.
    pub async fn list_incidents(&self, limit: u64) -> Result<Vec<incident::Model>> {
        Ok(incident::Entity::find()
            .order_by_desc(incident::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// One incident with its ordered events and actions, by incident id.
    pub async fn get_incident(&self, incident_id: &str) -> Result<Option<IncidentDetail>> {
        let Some(found) = incident::Entity::find()
            .filter(incident::Column::IncidentId.eq(incident_id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let events = incident_event::Entity::find()
            .filter(incident_event::Column::IncidentId.eq(incident_id))
            .order_by_asc(incident_event::Column::Id)
            .all(&self.db)
            .await?;
        let actions = incident_action::Entity::find()
            .filter(incident_action::Column::IncidentId.eq(incident_id))
            .order_by_asc(incident_action::Column::Id)
            .all(&self.db)
            .await?;

        Ok(Some(IncidentDetail {
            incident: found,
            events,
            actions,
        }))
    }

    pub async fn get_action(&self, action_id: &str) -> Result<Option<incident_action::Model>> {
        Ok(incident_action::Entity::find()
            .filter(incident_action::Column::ActionId.eq(action_id))
            .one(&self.db)
            .await?)
    }
}

async fn append_event<C: sea_orm::ConnectionTrait>(
    conn: &C,
    incident_id: &str,
    event_kind: &str,
    raw_payload: &str,
    now: &str,
) -> Result<()> {
    incident_event::Entity::insert(incident_event::ActiveModel {
        incident_id: Set(incident_id.to_string()),
        kind: Set(event_kind.to_string()),
        payload: Set(raw_payload.to_string()),
        created_at: Set(now.to_string()),
        ..Default::default()
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}
