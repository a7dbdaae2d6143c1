//! Error types for era-sql

use era_ir::TypeError;
use thiserror::Error;

/// SQL generation and validation errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Relation or expression shape the dialect cannot express (S003)
    #[error("[S003] {dialect} does not support {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: String,
    },

    /// Generated SQL failed validation (S004)
    #[error("[S004] SQL validation failed: {0}")]
    ValidationError(String),

    /// The relation does not type check (S005)
    #[error("[S005] {0}")]
    Type(#[from] TypeError),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
