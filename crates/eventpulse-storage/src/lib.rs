//! Per-service relational storage for the event pipeline.
//!
//! Each service owns exactly one database and talks to it through a store
//! type here ([`IngestStore`], [`RuleStore`], [`RunnerStore`],
//! [`IncidentStore`]); there are no cross-service reads. All stores share
//! the transactional inbox/outbox protocol in [`protocol`]: outbox rows are
//! appended in the same transaction as the business mutation, and consumers
//! insert the producer's dedup key in the same transaction as the side
//! effect, so redelivered messages short-circuit as duplicates.
//!
//! Production DSNs are PostgreSQL; tests connect the same stores to
//! `sqlite::memory:`.

pub mod entities;
pub mod error;
pub mod protocol;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{Result, StorageError};
pub use protocol::DedupOutcome;
pub use store::incident::{ActionOutcome, IncidentDetail, IncidentStore, Projection};
pub use store::ingest::{AlertUpsert, IngestStore};
pub use store::rules::{OutboxEntry, RuleStore};
pub use store::runner::{ActionStart, RunnerStore};

/// Incident lifecycle states as stored in `incidents.status`.
pub mod incident_status {
    pub const OPEN: &str = "open";
    pub const MITIGATING: &str = "mitigating";
    pub const RESOLVED: &str = "resolved";
    pub const FAILED: &str = "failed";
}

/// Action lifecycle states, shared by `action_exec` and `actions` rows.
pub mod action_status {
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}
