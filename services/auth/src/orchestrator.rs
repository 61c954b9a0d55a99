//! User-facing authentication flows
//!
//! Composes the password, token, session, and revocation services into
//! registration, login (with upgrade-on-login), password change and reset,
//! token refresh, per-request authentication, and logout. Every operation is
//! request-scoped; the only long-lived state is the immutable configuration
//! baked into the services at process start.

use common::error::StoreError;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{DeviceInfo, Identity, NewIdentity, RevocationReason, Role};
use crate::password::{ComplexityContext, PasswordService};
use crate::revocation::RevocationService;
use crate::session::SessionManager;
use crate::store::IdentityStore;
use crate::token::{TokenPair, TokenService};
use crate::validation::{validate_display_name, validate_email};

/// Everything a successful login hands to the boundary layer
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
    /// Opaque token for the session row created by this login; the boundary
    /// stores it as an http-only cookie
    pub session_token: String,
}

/// Auth orchestrator
#[derive(Clone)]
pub struct AuthOrchestrator {
    identities: Arc<dyn IdentityStore>,
    passwords: PasswordService,
    tokens: TokenService,
    sessions: SessionManager,
    revocations: RevocationService,
}

impl AuthOrchestrator {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        passwords: PasswordService,
        tokens: TokenService,
        sessions: SessionManager,
        revocations: RevocationService,
    ) -> Self {
        Self {
            identities,
            passwords,
            tokens,
            sessions,
            revocations,
        }
    }

    /// Session manager, for boundary flows like "list my devices"
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Revocation service, for the hosting process's purge schedule
    pub fn revocations(&self) -> &RevocationService {
        &self.revocations
    }

    /// Register a new identity
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> AuthResult<Identity> {
        let email = email.trim().to_ascii_lowercase();
        validate_email(&email).map_err(|e| AuthError::Validation(vec![e]))?;
        validate_display_name(name).map_err(|e| AuthError::Validation(vec![e]))?;

        let report = self.passwords.validate_complexity(
            password,
            ComplexityContext {
                email: &email,
                name,
            },
        );
        if !report.is_valid {
            return Err(AuthError::WeakPassword(report.errors));
        }

        let hashed = self.passwords.hash_with_salt(password)?;
        let identity = self
            .identities
            .insert(NewIdentity {
                email,
                name: name.trim().to_string(),
                password_hash: hashed.hash,
                salt: Some(hashed.salt),
                role,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::Validation(vec![
                    "An account with this email already exists".to_string(),
                ]),
                other => AuthError::Store(other),
            })?;

        info!("Registered identity {} ({})", identity.id, identity.role);
        Ok(identity)
    }

    /// Verify credentials, upgrade the stored hash if it is due, and open a
    /// session. Unknown email and wrong password fail identically.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: DeviceInfo,
    ) -> AuthResult<LoginOutcome> {
        let email = email.trim().to_ascii_lowercase();

        let Some(identity) = self.identities.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let (verified, upgrade_due) = match identity.salt.as_deref() {
            Some(salt) => {
                let ok = self
                    .passwords
                    .verify_with_salt(password, &identity.password_hash, salt);
                (ok, ok && self.passwords.needs_rehash(&identity.password_hash))
            }
            None => {
                // Pre-salting record; a successful verify always upgrades.
                let ok = self.passwords.verify_legacy(password, &identity.password_hash);
                (ok, ok)
            }
        };

        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        // Upgrade-on-login happens before anything is returned, so the old
        // hash never outlives the login that proved it weak.
        let identity = if upgrade_due {
            self.upgrade_stored_hash(identity, password).await?
        } else {
            identity
        };

        let pair = self.tokens.issue_pair(identity.id)?;
        let session_token = self.sessions.create(identity.id, &device).await?;

        info!("Identity {} logged in", identity.id);
        Ok(LoginOutcome {
            identity,
            access_token: pair.access,
            refresh_token: pair.refresh,
            session_token,
        })
    }

    async fn upgrade_stored_hash(
        &self,
        identity: Identity,
        password: &str,
    ) -> AuthResult<Identity> {
        let hashed = self.passwords.hash_with_salt(password)?;
        let applied = self
            .identities
            .update_password_if_unchanged(
                identity.id,
                identity.password_updated_at,
                &hashed.hash,
                Some(&hashed.salt),
            )
            .await?;

        if applied {
            info!("Upgraded stored hash for identity {}", identity.id);
        } else {
            // A concurrent login won the upgrade; it wrote an equivalent
            // hash for the same password, so nothing is lost.
            warn!(
                "Skipped hash upgrade for identity {}: row changed underneath",
                identity.id
            );
        }

        self.identities
            .find_by_id(identity.id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Change a password after verifying the current one. Equality with the
    /// current password is established through verification; the stored hash
    /// is never compared against plaintext.
    pub async fn change_password(
        &self,
        identity_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.verify_against(&identity, current_password) {
            return Err(AuthError::WrongCurrentPassword);
        }

        if self.verify_against(&identity, new_password) {
            return Err(AuthError::SamePassword);
        }

        let report = self.passwords.validate_complexity(
            new_password,
            ComplexityContext {
                email: &identity.email,
                name: &identity.name,
            },
        );
        if !report.is_valid {
            return Err(AuthError::WeakPassword(report.errors));
        }

        self.persist_new_password(&identity, new_password).await?;
        info!("Identity {} changed password", identity.id);
        Ok(())
    }

    /// Administrative password reset. Requires the acting identity to be an
    /// admin; bypasses current-password verification and logs the target out
    /// of every device.
    pub async fn reset_password(
        &self,
        identity_id: Uuid,
        new_password: &str,
        acting_identity_id: Uuid,
    ) -> AuthResult<()> {
        let actor = self
            .identities
            .find_by_id(acting_identity_id)
            .await?
            .ok_or(AuthError::Forbidden)?;
        if actor.role != Role::Admin {
            return Err(AuthError::Forbidden);
        }

        let identity = self
            .identities
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let report = self.passwords.validate_complexity(
            new_password,
            ComplexityContext {
                email: &identity.email,
                name: &identity.name,
            },
        );
        if !report.is_valid {
            return Err(AuthError::WeakPassword(report.errors));
        }

        self.persist_new_password(&identity, new_password).await?;
        self.sessions
            .terminate_all_for_identity(identity.id, None)
            .await?;

        info!(
            "Admin {} reset password for identity {}",
            actor.id, identity.id
        );
        Ok(())
    }

    /// Exchange a valid, unrevoked refresh token for a fresh pair. The
    /// presented token is retired before the new pair goes out (rotation),
    /// so a captured refresh token cannot be replayed after its legitimate
    /// holder uses it. Fails closed with `None`.
    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<Option<TokenPair>> {
        let Some(identity_id) = self.tokens.verify_refresh(refresh_token) else {
            return Ok(None);
        };

        if self.revocations.is_revoked(refresh_token).await? {
            return Ok(None);
        }

        // The identity may have vanished between issuance and use.
        if self.identities.find_by_id(identity_id).await?.is_none() {
            return Ok(None);
        }

        self.revocations
            .revoke(refresh_token, RevocationReason::Rotation)
            .await?;

        Ok(Some(self.tokens.issue_pair(identity_id)?))
    }

    /// Per-request path: verify the access token, then consult the denylist.
    /// Identity existence is deliberately not re-checked here; the token's
    /// short lifetime bounds the window.
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<Option<Uuid>> {
        let Some(identity_id) = self.tokens.verify_access(access_token) else {
            return Ok(None);
        };

        if self.revocations.is_revoked(access_token).await? {
            return Ok(None);
        }

        Ok(Some(identity_id))
    }

    /// Revoke the caller's tokens and terminate their session
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        session_token: Option<&str>,
    ) -> AuthResult<()> {
        self.revocations
            .revoke(access_token, RevocationReason::Logout)
            .await?;

        if let Some(refresh_token) = refresh_token {
            self.revocations
                .revoke(refresh_token, RevocationReason::Logout)
                .await?;
        }

        if let Some(session_token) = session_token {
            self.sessions.terminate(session_token).await?;
        }

        Ok(())
    }

    fn verify_against(&self, identity: &Identity, password: &str) -> bool {
        match identity.salt.as_deref() {
            Some(salt) => self
                .passwords
                .verify_with_salt(password, &identity.password_hash, salt),
            None => self.passwords.verify_legacy(password, &identity.password_hash),
        }
    }

    async fn persist_new_password(&self, identity: &Identity, password: &str) -> AuthResult<()> {
        let hashed = self.passwords.hash_with_salt(password)?;
        let applied = self
            .identities
            .update_password_if_unchanged(
                identity.id,
                identity.password_updated_at,
                &hashed.hash,
                Some(&hashed.salt),
            )
            .await?;

        if !applied {
            // Someone else rewrote the credential mid-flight; surfacing a
            // store conflict beats silently clobbering their write.
            return Err(StoreError::Conflict(format!(
                "password for identity {} changed concurrently",
                identity.id
            ))
            .into());
        }

        Ok(())
    }
}
