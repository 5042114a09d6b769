//! Error types for session operations.

use sqlbridge_core::{CoreError, DbError, Engine};
use thiserror::Error;

/// Session-level errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs an open session.
    #[error("session is not connected")]
    NotConnected,

    /// A write or delete was attempted on a read-only session.
    #[error("session is read-only")]
    ReadOnlyViolation,

    /// The write mode is unknown or deliberately unimplemented.
    #[error("unsupported write mode: {0}")]
    UnsupportedWriteMode(String),

    /// An insert failed and the engine has no duplicate-key signature to
    /// decide whether falling back to an update is safe.
    #[error("cannot classify insert failure for engine {engine}: {source}")]
    DialectConstraintUnrecognized {
        /// Active engine.
        engine: Engine,
        /// The original insert failure.
        #[source]
        source: DbError,
    },

    /// Invalid transaction or lifecycle transition.
    #[error("invalid session state: {0}")]
    TransactionState(String),

    /// The database has no procedure with this name.
    #[error("stored procedure not found: {0}")]
    ProcedureNotFound(String),

    /// Statement building or parameter binding failed.
    #[error(transparent)]
    Build(#[from] CoreError),

    /// Error reported by the database.
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

impl SessionError {
    /// The underlying database error, when there is one.
    #[must_use]
    pub const fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::Database(err) | Self::DialectConstraintUnrecognized { source: err, .. } => {
                Some(err)
            }
            _ => None,
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
