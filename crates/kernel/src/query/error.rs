//! Query error types.

use thiserror::Error;

/// Errors raised when a compiled filter is rejected or executed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The filter compiled with errors and the caller asked for strictness.
    #[error("invalid filter: {}", .0.join("; "))]
    InvalidFilter(Vec<String>),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}
