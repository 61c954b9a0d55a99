//! Persistence boundary for the auth core
//!
//! The platform's persistent store is an external collaborator; these traits
//! are the contract the core writes against. `PgStore` is the production
//! backend, `MemoryStore` backs the test suite and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::StoreResult;
use uuid::Uuid;

use crate::models::{Identity, NewIdentity, NewSession, RevokedToken, Session};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Reads and writes against the identities table
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Persist a new identity; duplicate emails surface as
    /// `StoreError::Conflict`
    async fn insert(&self, new: NewIdentity) -> StoreResult<Identity>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    /// Optimistic password write: applies only while `password_updated_at`
    /// still equals `expected`, so a concurrent upgrade or change cannot be
    /// silently overwritten. Returns whether the row was updated.
    async fn update_password_if_unchanged(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        password_hash: &str,
        salt: Option<&str>,
    ) -> StoreResult<bool>;
}

/// Reads and writes against the sessions table
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, new: NewSession) -> StoreResult<Session>;

    /// Active, unexpired sessions ordered by `last_activity_at` descending
    async fn list_active(&self, identity_id: Uuid) -> StoreResult<Vec<Session>>;

    /// Soft-deactivate one session. Unknown or already-inactive tokens are a
    /// no-op reported as `false`.
    async fn deactivate(&self, session_token: &str) -> StoreResult<bool>;

    /// Soft-deactivate every active session for an identity, sparing
    /// `except_token` when given. One statement, atomic at the store's
    /// granularity. Returns the affected-row count.
    async fn deactivate_all(
        &self,
        identity_id: Uuid,
        except_token: Option<&str>,
    ) -> StoreResult<u64>;

    /// Bump `last_activity_at` on an active session
    async fn touch(&self, session_token: &str) -> StoreResult<bool>;
}

/// Reads and writes against the revoked_tokens table
#[async_trait]
pub trait RevokedTokenStore: Send + Sync {
    /// Idempotent: re-revoking an already-listed hash is a no-op
    async fn insert(&self, row: RevokedToken) -> StoreResult<()>;

    async fn find(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>>;

    /// Delete rows whose recorded expiry is at or before `now`; returns the
    /// number removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
