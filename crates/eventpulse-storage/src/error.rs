/// Errors surfaced by the storage layer.
///
/// Inbox uniqueness conflicts never reach this type: the protocol helpers
/// translate them into [`crate::DedupOutcome::Duplicate`] because "already
/// processed" is an answer, not a failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying database error.
    #[error("storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
