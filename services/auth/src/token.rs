//! Bearer-token issuance and verification
//!
//! Access and refresh tokens are HS256 JWTs signed with distinct secrets and
//! carrying a closed kind marker, so one class can never pass verification
//! as the other. Verification fails closed: any signature, expiry, or kind
//! problem yields `None`, never an error. Access verification is stateless;
//! revocation is the `RevocationService`'s concern and identity existence is
//! only re-checked on the refresh flow.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthResult;

/// Closed token discriminator, enforced at signing and verification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity ID
    pub sub: Uuid,
    /// Unique token ID. `iat` has second granularity, so without a nonce
    /// two same-kind tokens minted for one identity in the same second
    /// would be byte-identical and revoking one would revoke both.
    pub jti: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token kind
    pub kind: TokenKind,
}

/// An access/refresh pair issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token service
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_expiry: u64,
    refresh_expiry: u64,
}

impl TokenService {
    /// Initialize a new token service from process configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_expiry: config.access_token_expiry,
            refresh_expiry: config.refresh_token_expiry,
        }
    }

    fn issue(&self, identity_id: Uuid, kind: TokenKind) -> AuthResult<String> {
        let now = Utc::now().timestamp() as u64;
        let (key, expiry) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_expiry),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_expiry),
        };

        let claims = Claims {
            sub: identity_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + expiry,
            kind,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, key)?)
    }

    /// Issue a fresh access/refresh pair for an identity
    pub fn issue_pair(&self, identity_id: Uuid) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(identity_id, TokenKind::Access)?,
            refresh: self.issue(identity_id, TokenKind::Refresh)?,
        })
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Option<Uuid> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, key, &validation).ok()?;

        (data.claims.kind == kind).then_some(data.claims.sub)
    }

    /// Verify an access token; `None` on bad signature, expiry, or kind
    /// mismatch
    pub fn verify_access(&self, token: &str) -> Option<Uuid> {
        self.verify(token, TokenKind::Access)
    }

    /// Verify a refresh token; `None` on bad signature, expiry, or kind
    /// mismatch
    pub fn verify_refresh(&self, token: &str) -> Option<Uuid> {
        self.verify(token, TokenKind::Refresh)
    }

    /// Read the expiry out of a token we signed, even if it has already
    /// passed. The signature is still checked against both secrets; an
    /// unparseable or foreign token yields `None`. Used by revocation to
    /// copy the token's own expiry into the denylist.
    pub fn peek_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        for key in [&self.access_decoding, &self.refresh_decoding] {
            if let Ok(data) = decode::<Claims>(token, key, &validation) {
                return DateTime::from_timestamp(data.claims.exp as i64, 0);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            session_ttl: 2592000,
            revocation_purge_interval: 3600,
        }
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let svc = TokenService::new(&config());
        let id = Uuid::new_v4();
        let pair = svc.issue_pair(id).unwrap();

        assert_eq!(svc.verify_access(&pair.access), Some(id));
        assert_eq!(svc.verify_refresh(&pair.refresh), Some(id));
    }

    #[test]
    fn test_back_to_back_issues_are_distinct() {
        let svc = TokenService::new(&config());
        let id = Uuid::new_v4();

        // Same identity, same kind, same second: the nonce must still make
        // every token unique, or revoking one would revoke them all.
        let first = svc.issue_pair(id).unwrap();
        let second = svc.issue_pair(id).unwrap();

        assert_ne!(first.access, second.access);
        assert_ne!(first.refresh, second.refresh);
    }

    #[test]
    fn test_kind_enforcement_is_bidirectional() {
        let svc = TokenService::new(&config());
        let pair = svc.issue_pair(Uuid::new_v4()).unwrap();

        assert_eq!(svc.verify_access(&pair.refresh), None);
        assert_eq!(svc.verify_refresh(&pair.access), None);
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let svc = TokenService::new(&config());
        let other = TokenService::new(&AuthConfig {
            access_secret: "some-other-secret".to_string(),
            refresh_secret: "yet-another-secret".to_string(),
            ..config()
        });

        let pair = other.issue_pair(Uuid::new_v4()).unwrap();
        assert_eq!(svc.verify_access(&pair.access), None);
        assert_eq!(svc.peek_expiry(&pair.access), None);
    }

    #[test]
    fn test_expired_token_is_rejected_but_peekable() {
        let svc = TokenService::new(&config());
        let id = Uuid::new_v4();

        let past = (Utc::now().timestamp() - 7200) as u64;
        let claims = Claims {
            sub: id,
            jti: Uuid::new_v4(),
            iat: past,
            exp: past + 900,
            kind: TokenKind::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-access-secret"),
        )
        .unwrap();

        assert_eq!(svc.verify_access(&token), None);
        let expiry = svc.peek_expiry(&token).unwrap();
        assert_eq!(expiry.timestamp() as u64, past + 900);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let svc = TokenService::new(&config());
        assert_eq!(svc.verify_access("not-a-token"), None);
        assert_eq!(svc.verify_refresh(""), None);
        assert_eq!(svc.peek_expiry("not-a-token"), None);
    }
}
