//! Storage error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection loss, pool timeout, or other recoverable condition. The
    /// caller should abort the current operation and retry on its next
    /// cycle.
    #[error("transient storage error: {0}")]
    Transient(#[source] sqlx::Error),

    /// Unique violation, check violation, or other schema-level rejection.
    /// Fatal for the operation; logged with full context.
    #[error("storage constraint violation: {0}")]
    Constraint(#[source] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,
}

impl StorageError {
    /// Classify a raw `sqlx::Error` the way the rest of this crate's error
    /// enums classify failures: connection/pool conditions are transient,
    /// everything else (unique violations, etc.) is a constraint failure.
    #[must_use]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Transient(err)
            }
            sqlx::Error::RowNotFound => Self::NotFound,
            _ => Self::Constraint(err),
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err)
    }
}
