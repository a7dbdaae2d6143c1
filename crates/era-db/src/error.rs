//! Error types for era-db

use era_sql::SqlError;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// A runtime invariant of the relation failed (D004)
    #[error("{message}")]
    InvariantViolated { message: String },

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),

    /// The relation could not be compiled (D008)
    #[error(transparent)]
    Compile(#[from] SqlError),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error carries no structured variants, so errors are
        // classified by message.
        let msg = err.to_string();
        if let Some(message) = invariant_message(&msg) {
            DbError::InvariantViolated { message }
        } else if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

/// Extract `Invariant *…* failed!` from a failed cast reported by the
/// database
pub(crate) fn invariant_message(msg: &str) -> Option<String> {
    const START: &str = "Invariant *";
    const END: &str = "* failed!";
    let start = msg.find(START)?;
    let end = msg[start + START.len()..].find(END)? + start + START.len() + END.len();
    Some(msg[start..end].to_string())
}
