//! Token-hash denylist
//!
//! Bearer tokens are stateless, so logout works by recording the SHA-256
//! hash of the revoked token until the token would have expired on its own.
//! Lookups ignore rows past their recorded expiry even before a physical
//! purge; natural expiry supersedes the denylist entry.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

use crate::error::AuthResult;
use crate::models::{RevocationReason, RevokedToken};
use crate::store::RevokedTokenStore;
use crate::token::TokenService;

/// Revocation service over the revoked_tokens table
#[derive(Clone)]
pub struct RevocationService {
    store: Arc<dyn RevokedTokenStore>,
    tokens: TokenService,
}

impl RevocationService {
    pub fn new(store: Arc<dyn RevokedTokenStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// The denylist key for a raw token. The raw value is never stored.
    pub fn token_hash(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Put a token on the denylist until its own expiry. Tokens that are
    /// unparseable or already expired can never verify again, so they are a
    /// no-op here.
    pub async fn revoke(&self, token: &str, reason: RevocationReason) -> AuthResult<()> {
        let Some(expires_at) = self.tokens.peek_expiry(token) else {
            return Ok(());
        };
        if expires_at <= Utc::now() {
            return Ok(());
        }

        self.store
            .insert(RevokedToken {
                token_hash: Self::token_hash(token),
                expires_at,
                reason,
                revoked_at: Utc::now(),
            })
            .await?;

        info!("Revoked token ({})", reason);
        Ok(())
    }

    /// Whether a token is on the denylist. A matching row past its own
    /// recorded expiry counts as not-revoked.
    pub async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        match self.store.find(&Self::token_hash(token)).await? {
            Some(row) => Ok(row.expires_at > Utc::now()),
            None => Ok(false),
        }
    }

    /// Drop rows whose recorded expiry has passed. The schedule is owned by
    /// the hosting process (see `AuthConfig::revocation_purge_interval`).
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let removed = self.store.purge_expired(Utc::now()).await?;
        if removed > 0 {
            info!("Purged {} expired denylist row(s)", removed);
        }
        Ok(removed)
    }
}
