//! Store-level error types
//!
//! Every persistence backend maps its failures into these variants so the
//! service layer stays backend-agnostic. A store failure is always fatal for
//! the request that hit it; nothing in the core retries or swallows one.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Failures raised by a persistent store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while establishing a connection
    #[error("store connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during query execution
    #[error("store query error: {0}")]
    Query(#[from] SqlxError),

    /// A uniqueness guarantee was violated (duplicate email, replayed write)
    #[error("store conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
