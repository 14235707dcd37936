//! Store failures and their recovery classification

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// A failed store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not obtain a connection from the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The database rejected or failed a statement.
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
}

/// Recovery-relevant classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target daily partition does not exist yet. Recoverable by
    /// creating the partition and retrying the write.
    MissingPartition,

    /// Anything else: syntax errors, constraint violations, lost
    /// connections. The caller requeues and retries later.
    Other,
}

impl StoreError {
    /// Classify this failure for the create-and-retry decision.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Database(e) => classify_code(e.code()),
            // Pool errors carry no SQLSTATE and never mean a missing
            // relation.
            StoreError::Pool(_) => ErrorKind::Other,
        }
    }
}

/// Map a structured SQLSTATE to the recovery taxonomy.
///
/// Only "undefined relation" is distinguished; every other state is handled
/// identically by the caller, so no finer taxonomy is kept.
pub fn classify_code(code: Option<&SqlState>) -> ErrorKind {
    match code {
        Some(state) if *state == SqlState::UNDEFINED_TABLE => ErrorKind::MissingPartition,
        _ => ErrorKind::Other,
    }
}
