//! In-memory store backend
//!
//! Backs the test suite and local development. Semantics mirror `PgStore`:
//! case-sensitive unique emails, soft session deactivation, idempotent
//! denylist inserts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{StoreError, StoreResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Identity, NewIdentity, NewSession, RevokedToken, Session};
use crate::store::{IdentityStore, RevokedTokenStore, SessionStore};

/// Store backend holding everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
    sessions: RwLock<Vec<Session>>,
    revoked: RwLock<HashMap<String, RevokedToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert(&self, new: NewIdentity) -> StoreResult<Identity> {
        let mut identities = self.identities.write().await;

        if identities.values().any(|i| i.email == new.email) {
            return Err(StoreError::Conflict(format!(
                "identity already exists for {}",
                new.email
            )));
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            salt: new.salt,
            role: new.role,
            password_updated_at: now,
            created_at: now,
        };
        identities.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.get(&id).cloned())
    }

    async fn update_password_if_unchanged(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        password_hash: &str,
        salt: Option<&str>,
    ) -> StoreResult<bool> {
        let mut identities = self.identities.write().await;

        match identities.get_mut(&id) {
            Some(identity) if identity.password_updated_at == expected => {
                identity.password_hash = password_hash.to_string();
                identity.salt = salt.map(str::to_string);
                identity.password_updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, new: NewSession) -> StoreResult<Session> {
        let mut sessions = self.sessions.write().await;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            identity_id: new.identity_id,
            session_token: new.session_token,
            device_fingerprint: new.device_fingerprint,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            is_active: true,
            last_activity_at: now,
            created_at: now,
            expires_at: new.expires_at,
        };
        sessions.push(session.clone());

        Ok(session)
    }

    async fn list_active(&self, identity_id: Uuid) -> StoreResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();

        let mut active: Vec<Session> = sessions
            .iter()
            .filter(|s| s.identity_id == identity_id && s.is_active && s.expires_at > now)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        Ok(active)
    }

    async fn deactivate(&self, session_token: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().await;

        match sessions
            .iter_mut()
            .find(|s| s.session_token == session_token && s.is_active)
        {
            Some(session) => {
                session.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_all(
        &self,
        identity_id: Uuid,
        except_token: Option<&str>,
    ) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let mut affected = 0;

        for session in sessions.iter_mut() {
            if session.identity_id == identity_id
                && session.is_active
                && except_token != Some(session.session_token.as_str())
            {
                session.is_active = false;
                affected += 1;
            }
        }

        Ok(affected)
    }

    async fn touch(&self, session_token: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().await;

        match sessions
            .iter_mut()
            .find(|s| s.session_token == session_token && s.is_active)
        {
            Some(session) => {
                session.last_activity_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RevokedTokenStore for MemoryStore {
    async fn insert(&self, row: RevokedToken) -> StoreResult<()> {
        let mut revoked = self.revoked.write().await;
        revoked.entry(row.token_hash.clone()).or_insert(row);
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>> {
        let revoked = self.revoked.read().await;
        Ok(revoked.get(token_hash).cloned())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, row| row.expires_at > now);
        Ok((before - revoked.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RevocationReason, Role};

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            name: "Test Person".to_string(),
            password_hash: "hash".to_string(),
            salt: Some("salt".to_string()),
            role: Role::Reader,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        IdentityStore::insert(&store, new_identity("dup@example.com"))
            .await
            .unwrap();

        let err = IdentityStore::insert(&store, new_identity("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_optimistic_password_write() {
        let store = MemoryStore::new();
        let identity = IdentityStore::insert(&store, new_identity("opt@example.com"))
            .await
            .unwrap();

        let applied = store
            .update_password_if_unchanged(
                identity.id,
                identity.password_updated_at,
                "new-hash",
                Some("new-salt"),
            )
            .await
            .unwrap();
        assert!(applied);

        // Second write with the stale timestamp loses the race.
        let applied = store
            .update_password_if_unchanged(
                identity.id,
                identity.password_updated_at,
                "other-hash",
                Some("other-salt"),
            )
            .await
            .unwrap();
        assert!(!applied);

        let stored = store.find_by_id(identity.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_revoked_insert_is_idempotent() {
        let store = MemoryStore::new();
        let row = RevokedToken {
            token_hash: "abc".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            reason: RevocationReason::Logout,
            revoked_at: Utc::now(),
        };

        RevokedTokenStore::insert(&store, row.clone()).await.unwrap();
        RevokedTokenStore::insert(
            &store,
            RevokedToken {
                reason: RevocationReason::Rotation,
                ..row
            },
        )
        .await
        .unwrap();

        let stored = store.find("abc").await.unwrap().unwrap();
        assert_eq!(stored.reason, RevocationReason::Logout);
    }
}
