use migration::{IngestMigrator, MigratorTrait};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectOptions, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::entities::{alert, outbox_event};
use crate::{protocol, Result};

/// One alert observation to fold into the `alerts` table, together with the
/// `alert.raised` envelope that must be enqueued with it.
#[derive(Debug, Clone)]
pub struct AlertUpsert {
    pub fingerprint: String,
    pub status: String,
    pub labels_json: String,
    pub annotations_json: String,
    pub starts_at: String,
    pub ends_at: String,
    pub event_payload: String,
}

/// Store backing the Ingest service.
pub struct IngestStore {
    db: DatabaseConnection,
}

impl IngestStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(dsn)).await
    }

    pub async fn connect_with(options: ConnectOptions) -> Result<Self> {
        let db = super::connect(options).await?;
        IngestMigrator::up(&db, None).await?;
        tracing::info!("Ingest store ready");
        Ok(Self { db })
    }

    /// Applies a webhook batch in one transaction: per alert, update the
    /// row by fingerprint (bumping `occurrences` and `last_seen`), insert
    /// it on first observation, and append the `alert.raised` outbox row.
    pub async fn record_batch(&self, batch: &[AlertUpsert], now: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        for item in batch {
            let updated = alert::Entity::update_many()
                .col_expr(alert::Column::Status, Expr::value(item.status.clone()))
                .col_expr(alert::Column::Labels, Expr::value(item.labels_json.clone()))
                .col_expr(
                    alert::Column::Annotations,
                    Expr::value(item.annotations_json.clone()),
                )
                .col_expr(alert::Column::StartsAt, Expr::value(item.starts_at.clone()))
                .col_expr(alert::Column::EndsAt, Expr::value(item.ends_at.clone()))
                .col_expr(alert::Column::LastSeen, Expr::value(now))
                .col_expr(
                    alert::Column::Occurrences,
                    Expr::col(alert::Column::Occurrences).add(1),
                )
                .filter(alert::Column::Fingerprint.eq(item.fingerprint.as_str()))
                .exec(&txn)
                .await?;

            if updated.rows_affected == 0 {
                alert::ActiveModel {
                    fingerprint: Set(item.fingerprint.clone()),
                    status: Set(item.status.clone()),
                    labels: Set(item.labels_json.clone()),
                    annotations: Set(item.annotations_json.clone()),
                    starts_at: Set(item.starts_at.clone()),
                    ends_at: Set(item.ends_at.clone()),
                    first_seen: Set(now.to_string()),
                    last_seen: Set(now.to_string()),
                    occurrences: Set(1),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }

            protocol::append_outbox(
                &txn,
                eventpulse_common::types::kind::ALERT_RAISED,
                &item.event_payload,
                now,
            )
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn get_alert(&self, fingerprint: &str) -> Result<Option<alert::Model>> {
        Ok(alert::Entity::find()
            .filter(alert::Column::Fingerprint.eq(fingerprint))
            .order_by_desc(alert::Column::Id)
            .one(&self.db)
            .await?)
    }

    pub async fn list_outbox(&self) -> Result<Vec<outbox_event::Model>> {
        protocol::list_outbox(&self.db).await
    }
}
