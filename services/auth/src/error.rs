//! Error taxonomy for the auth core
//!
//! The variants match what the HTTP boundary needs to map status codes:
//! `InvalidCredentials` and token failures become 401, `Forbidden` 403,
//! `SamePassword` 409, `WeakPassword` and `Validation` 400, everything else
//! a 5xx. Credential failures are deliberately uninformative about which
//! sub-check failed so the API cannot be used as an account-existence
//! oracle.

use common::error::StoreError;
use thiserror::Error;

/// Failures surfaced by the auth core
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed input: bad email shape, duplicate registration
    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    /// Unknown email or wrong password; the two are indistinguishable on
    /// purpose
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The supplied current password did not verify
    #[error("current password does not match")]
    WrongCurrentPassword,

    /// The proposed password failed the complexity rules
    #[error("password does not meet complexity requirements: {0:?}")]
    WeakPassword(Vec<String>),

    /// The proposed password verifies against the stored hash
    #[error("new password must differ from the current one")]
    SamePassword,

    /// The acting identity lacks the required role
    #[error("insufficient role")]
    Forbidden,

    /// The referenced identity does not exist
    #[error("identity not found")]
    NotFound,

    /// Password hashing failed; argon2's error type is not std::error::Error
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Token signing failed
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The persistent store failed; always fatal for the request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;
