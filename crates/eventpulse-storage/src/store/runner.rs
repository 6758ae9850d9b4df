use migration::{ActionMigrator, MigratorTrait};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

use crate::entities::{action_exec, outbox_event};
use crate::{action_status, protocol, DedupOutcome, Result};

/// Fields recorded when an action starts executing.
#[derive(Debug, Clone)]
pub struct ActionStart {
    pub action_id: String,
    pub kind: String,
    pub desired_replicas: i32,
    pub alert_fp: String,
}

/// Store backing the Action Runner.
pub struct RunnerStore {
    db: DatabaseConnection,
}

impl RunnerStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(dsn)).await
    }

    pub async fn connect_with(options: ConnectOptions) -> Result<Self> {
        let db = super::connect(options).await?;
        ActionMigrator::up(&db, None).await?;
        tracing::info!("Runner store ready");
        Ok(Self { db })
    }

    /// Claims the message's dedup key and upserts the `action_exec` row as
    /// `running`, in one transaction. Redelivery of an already-executed
    /// action returns [`DedupOutcome::Duplicate`] and leaves the terminal
    /// row untouched.
    pub async fn begin_action(
        &self,
        dedup_key: &str,
        start: &ActionStart,
        now: &str,
    ) -> Result<DedupOutcome> {
        let txn = self.db.begin().await?;
        if protocol::insert_inbox(&txn, dedup_key, now).await?.is_duplicate() {
            txn.rollback().await?;
            return Ok(DedupOutcome::Duplicate);
        }

        action_exec::Entity::insert(action_exec::ActiveModel {
            action_id: Set(start.action_id.clone()),
            kind: Set(start.kind.clone()),
            desired_replicas: Set(start.desired_replicas),
            alert_fp: Set(start.alert_fp.clone()),
            status: Set(action_status::RUNNING.to_string()),
            error: Set(None),
            created_at: Set(now.to_string()),
            updated_at: Set(now.to_string()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(action_exec::Column::ActionId)
                .update_columns([
                    action_exec::Column::Status,
                    action_exec::Column::Error,
                    action_exec::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;
        Ok(DedupOutcome::Fresh)
    }

    /// Moves the action row to its terminal status and enqueues the result
    /// event, in one transaction.
    pub async fn finish_action(
        &self,
        action_id: &str,
        status: &str,
        error: Option<&str>,
        event_kind: &str,
        payload: &str,
        now: &str,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        action_exec::Entity::update_many()
            .col_expr(action_exec::Column::Status, Expr::value(status))
            .col_expr(
                action_exec::Column::Error,
                Expr::value(error.map(str::to_string)),
            )
            .col_expr(action_exec::Column::UpdatedAt, Expr::value(now))
            .filter(action_exec::Column::ActionId.eq(action_id))
            .exec(&txn)
            .await?;
        protocol::append_outbox(&txn, event_kind, payload, now).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn get_action(&self, action_id: &str) -> Result<Option<action_exec::Model>> {
        Ok(action_exec::Entity::find()
            .filter(action_exec::Column::ActionId.eq(action_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_outbox(&self) -> Result<Vec<outbox_event::Model>> {
        protocol::list_outbox(&self.db).await
    }
}
