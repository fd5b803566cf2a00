//! Storage error type.

use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or failed an operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row holds a value the domain cannot interpret.
    #[error("corrupt row: {0}")]
    Corrupt(#[from] domain::UnknownEnumValue),

    /// A uniqueness rule was violated (duplicate pending order, duplicate
    /// line item). Named after the constraint that fired.
    #[error("constraint violated: {0}")]
    Conflict(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
