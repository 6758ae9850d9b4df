//! The transactional inbox/outbox protocol shared by every service.
//!
//! Both helpers are generic over [`ConnectionTrait`] so they compose into
//! whatever transaction the calling store has open: the inbox insert rides
//! the consumer's side-effect transaction, the outbox append rides the
//! producer's business mutation.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, QueryOrder};

use crate::entities::{inbox, outbox_event};
use crate::Result;

/// Result of attempting to claim a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// First sighting; the caller proceeds with its side effect.
    Fresh,
    /// The key was already claimed: the message was processed before and
    /// must be skipped.
    Duplicate,
}

impl DedupOutcome {
    pub fn is_duplicate(self) -> bool {
        matches!(self, DedupOutcome::Duplicate)
    }
}

/// Claims `dedup_key` in the consumer's inbox.
///
/// Uses `ON CONFLICT DO NOTHING` rather than letting the unique constraint
/// fire, so the surrounding transaction stays healthy on both PostgreSQL
/// and SQLite.
pub async fn insert_inbox<C: ConnectionTrait>(
    conn: &C,
    dedup_key: &str,
    now: &str,
) -> Result<DedupOutcome> {
    let rows = inbox::Entity::insert(inbox::ActiveModel {
        dedup_key: Set(dedup_key.to_string()),
        created_at: Set(now.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(inbox::Column::DedupKey)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(if rows == 0 {
        DedupOutcome::Duplicate
    } else {
        DedupOutcome::Fresh
    })
}

/// Appends an event to the producer's outbox inside the caller's
/// transaction. The row is the durable emission record; broker publication
/// happens after commit and may fail freely.
pub async fn append_outbox<C: ConnectionTrait>(
    conn: &C,
    kind: &str,
    payload: &str,
    now: &str,
) -> Result<()> {
    outbox_event::Entity::insert(outbox_event::ActiveModel {
        kind: Set(kind.to_string()),
        payload: Set(payload.to_string()),
        created_at: Set(now.to_string()),
        ..Default::default()
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

/// All outbox rows in append order.
pub async fn list_outbox<C: ConnectionTrait>(conn: &C) -> Result<Vec<outbox_event::Model>> {
    Ok(outbox_event::Entity::find()
        .order_by_asc(outbox_event::Column::Id)
        .all(conn)
        .await?)
}

/// All inbox rows in claim order.
pub async fn list_inbox<C: ConnectionTrait>(conn: &C) -> Result<Vec<inbox::Model>> {
    Ok(inbox::Entity::find()
        .order_by_asc(inbox::Column::Id)
        .all(conn)
        .await?)
}
