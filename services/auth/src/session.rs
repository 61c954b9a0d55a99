//! Multi-device session tracking
//!
//! Each login gets an opaque, cryptographically random session token,
//! unrelated to any bearer token. The boundary layer stores it as a cookie;
//! the core only ever compares it against stored rows. Termination is a
//! soft-deactivation and is idempotent.

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::AuthResult;
use crate::models::{DeviceInfo, NewSession, Session};
use crate::store::SessionStore;

/// Session manager over the sessions table
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    session_ttl: u64,
}

impl SessionManager {
    /// Create a new session manager; `session_ttl` is in seconds
    pub fn new(store: Arc<dyn SessionStore>, session_ttl: u64) -> Self {
        Self { store, session_ttl }
    }

    /// Create an active session for an identity and return its opaque token
    pub async fn create(&self, identity_id: Uuid, device: &DeviceInfo) -> AuthResult<String> {
        let session_token = generate_session_token();

        let device_fingerprint = match (&device.user_agent, &device.ip_address) {
            (None, None) => None,
            (ua, ip) => Some(Self::device_fingerprint(
                ua.as_deref().unwrap_or(""),
                ip.as_deref().unwrap_or(""),
            )),
        };

        let expires_at = Utc::now() + Duration::seconds(self.session_ttl as i64);

        self.store
            .insert(NewSession {
                identity_id,
                session_token: session_token.clone(),
                device_fingerprint,
                ip_address: device.ip_address.clone(),
                user_agent: device.user_agent.clone(),
                expires_at,
            })
            .await?;

        info!("Created session for identity {}", identity_id);
        Ok(session_token)
    }

    /// Active sessions for an identity, most recently used first
    pub async fn list_active_for_identity(&self, identity_id: Uuid) -> AuthResult<Vec<Session>> {
        Ok(self.store.list_active(identity_id).await?)
    }

    /// Deactivate one session. Unknown or already-inactive tokens report
    /// `false`, not an error.
    pub async fn terminate(&self, session_token: &str) -> AuthResult<bool> {
        Ok(self.store.deactivate(session_token).await?)
    }

    /// Deactivate every active session for an identity except the one
    /// matching `except_token`, if given. Backs both "log out of other
    /// devices" (with the current token) and "log out everywhere" (without).
    pub async fn terminate_all_for_identity(
        &self,
        identity_id: Uuid,
        except_token: Option<&str>,
    ) -> AuthResult<u64> {
        let affected = self.store.deactivate_all(identity_id, except_token).await?;
        info!(
            "Terminated {} session(s) for identity {}",
            affected, identity_id
        );
        Ok(affected)
    }

    /// Record activity on a session
    pub async fn touch(&self, session_token: &str) -> AuthResult<bool> {
        Ok(self.store.touch(session_token).await?)
    }

    /// Deterministic device hash for display and analytics. Never a security
    /// boundary: user agents and addresses are attacker-controlled.
    pub fn device_fingerprint(user_agent: &str, ip: &str) -> String {
        let digest = Sha256::digest(format!("{}|{}", user_agent, ip).as_bytes());
        hex::encode(digest)[..16].to_string()
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryStore::new()), 3600)
    }

    fn device() -> DeviceInfo {
        DeviceInfo {
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        }
    }

    #[test]
    fn test_device_fingerprint_is_deterministic() {
        let a = SessionManager::device_fingerprint("Mozilla/5.0", "203.0.113.7");
        let b = SessionManager::device_fingerprint("Mozilla/5.0", "203.0.113.7");
        let c = SessionManager::device_fingerprint("Mozilla/5.0", "203.0.113.8");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = generate_session_token();
        let b = generate_session_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let mgr = manager();
        let token = mgr.create(Uuid::new_v4(), &device()).await.unwrap();

        assert!(mgr.terminate(&token).await.unwrap());
        assert!(!mgr.terminate(&token).await.unwrap());
        assert!(!mgr.terminate("no-such-token").await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_excludes_terminated_sessions() {
        let mgr = manager();
        let identity_id = Uuid::new_v4();

        let first = mgr.create(identity_id, &device()).await.unwrap();
        let _second = mgr.create(identity_id, &device()).await.unwrap();
        assert_eq!(
            mgr.list_active_for_identity(identity_id).await.unwrap().len(),
            2
        );

        mgr.terminate(&first).await.unwrap();
        let active = mgr.list_active_for_identity(identity_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].session_token, first);
    }

    #[tokio::test]
    async fn test_touch_moves_session_to_front() {
        let mgr = manager();
        let identity_id = Uuid::new_v4();

        let first = mgr.create(identity_id, &device()).await.unwrap();
        let _second = mgr.create(identity_id, &device()).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(mgr.touch(&first).await.unwrap());

        let active = mgr.list_active_for_identity(identity_id).await.unwrap();
        assert_eq!(active[0].session_token, first);
    }
}
