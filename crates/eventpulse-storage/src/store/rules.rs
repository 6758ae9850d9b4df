use migration::{MigratorTrait, RulesMigrator};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectOptions, DatabaseConnection, EntityTrait,
    QueryOrder, TransactionTrait,
};

use crate::entities::{decision_log, outbox_event};
use crate::{protocol, DedupOutcome, Result};

/// An event pending publication: outbox `type` plus serialized envelope.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub kind: String,
    pub payload: String,
}

/// Store backing the Rule Engine.
pub struct RuleStore {
    db: DatabaseConnection,
}

impl RuleStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(dsn)).await
    }

    pub async fn connect_with(options: ConnectOptions) -> Result<Self> {
        let db = super::connect(options).await?;
        RulesMigrator::up(&db, None).await?;
        tracing::info!("Rule store ready");
        Ok(Self { db })
    }

    /// Commits one rule decision: claims the consumed message's dedup key,
    /// appends the rendered decision line, and enqueues the emitted events.
    /// Returns [`DedupOutcome::Duplicate`] without side effects when the
    /// message was already processed.
    pub async fn commit_decision(
        &self,
        dedup_key: &str,
        decision: &str,
        entries: &[OutboxEntry],
        now: &str,
    ) -> Result<DedupOutcome> {
        let txn = self.db.begin().await?;
        if protocol::insert_inbox(&txn, dedup_key, now).await?.is_duplicate() {
            txn.rollback().await?;
            return Ok(DedupOutcome::Duplicate);
        }

        decision_log::ActiveModel {
            decision: Set(decision.to_string()),
            created_at: Set(now.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for entry in entries {
            protocol::append_outbox(&txn, &entry.kind, &entry.payload, now).await?;
        }
        txn.commit().await?;
        Ok(DedupOutcome::Fresh)
    }

    /// Claims a consumed message's dedup key when classification produced
    /// nothing to persist. The inbox row still records the message as
    /// processed, so redelivery stays observable as a duplicate.
    pub async fn mark_processed(&self, dedup_key: &str, now: &str) -> Result<DedupOutcome> {
        protocol::insert_inbox(&self.db, dedup_key, now).await
    }

    /// Records a supervisor emission. The supervisor has no consumed
    /// message to dedup; its repeat suppression is the cooldown.
    pub async fn record_emission(
        &self,
        decision: &str,
        entries: &[OutboxEntry],
        now: &str,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        decision_log::ActiveModel {
            decision: Set(decision.to_string()),
            created_at: Set(now.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        for entry in entries {
            protocol::append_outbox(&txn, &entry.kind, &entry.payload, now).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn list_decisions(&self) -> Result<Vec<decision_log::Model>> {
        Ok(decision_log::Entity::find()
            .order_by_asc(decision_log::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_outbox(&self) -> Result<Vec<outbox_event::Model>> {
        protocol::list_outbox(&self.db).await
    }
}
