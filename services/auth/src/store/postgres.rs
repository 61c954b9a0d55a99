//! PostgreSQL store backend
//!
//! One backend struct implements all three store traits against the
//! identities, sessions, and revoked_tokens tables. Queries are
//! runtime-bound; the schema itself is owned by the platform's migration
//! tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{StoreError, StoreResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{Identity, NewIdentity, NewSession, RevokedToken, Session};
use crate::store::{IdentityStore, RevokedTokenStore, SessionStore};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration and wrap it
    pub async fn connect(config: &common::database::DatabaseConfig) -> StoreResult<Self> {
        let pool = common::database::init_pool(config).await?;
        Ok(Self { pool })
    }
}

fn identity_from_row(row: &PgRow) -> StoreResult<Identity> {
    let role: String = row.get("role");
    Ok(Identity {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        salt: row.get("salt"),
        role: role
            .parse()
            .map_err(|e: String| StoreError::Configuration(e))?,
        password_updated_at: row.get("password_updated_at"),
        created_at: row.get("created_at"),
    })
}

fn session_from_row(row: &PgRow) -> Session {
    Session {
        id: row.get("id"),
        identity_id: row.get("identity_id"),
        session_token: row.get("session_token"),
        device_fingerprint: row.get("device_fingerprint"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        is_active: row.get("is_active"),
        last_activity_at: row.get("last_activity_at"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn insert(&self, new: NewIdentity) -> StoreResult<Identity> {
        info!("Creating identity for {}", new.email);

        let row = sqlx::query(
            r#"
            INSERT INTO identities (id, email, name, password_hash, salt, role, password_updated_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            RETURNING id, email, name, password_hash, salt, role, password_updated_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(&new.salt)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Conflict(format!(
                        "identity already exists for {}",
                        new.email
                    ));
                }
            }
            StoreError::Query(e)
        })?;

        identity_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, salt, role, password_updated_at, created_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, salt, role, password_updated_at, created_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn update_password_if_unchanged(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        password_hash: &str,
        salt: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET password_hash = $2, salt = $3, password_updated_at = now()
            WHERE id = $1 AND password_updated_at = $4
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(salt)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert(&self, new: NewSession) -> StoreResult<Session> {
        info!("Creating session for identity {}", new.identity_id);

        let row = sqlx::query(
            r#"
            INSERT INTO sessions
                (id, identity_id, session_token, device_fingerprint, ip_address, user_agent,
                 is_active, last_activity_at, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, now(), now(), $7)
            RETURNING id, identity_id, session_token, device_fingerprint, ip_address, user_agent,
                      is_active, last_activity_at, created_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.identity_id)
        .bind(&new.session_token)
        .bind(&new.device_fingerprint)
        .bind(&new.ip_address)
        .bind(&new.user_agent)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session_from_row(&row))
    }

    async fn list_active(&self, identity_id: Uuid) -> StoreResult<Vec<Session>> {
        let rows = sqlx::query(
            r#"
            SELECT id, identity_id, session_token, device_fingerprint, ip_address, user_agent,
                   is_active, last_activity_at, created_at, expires_at
            FROM sessions
            WHERE identity_id = $1 AND is_active = TRUE AND expires_at > now()
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(session_from_row).collect())
    }

    async fn deactivate(&self, session_token: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE
            WHERE session_token = $1 AND is_active = TRUE
            "#,
        )
        .bind(session_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all(
        &self,
        identity_id: Uuid,
        except_token: Option<&str>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE
            WHERE identity_id = $1
              AND is_active = TRUE
              AND ($2::text IS NULL OR session_token <> $2)
            "#,
        )
        .bind(identity_id)
        .bind(except_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn touch(&self, session_token: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_activity_at = now()
            WHERE session_token = $1 AND is_active = TRUE
            "#,
        )
        .bind(session_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RevokedTokenStore for PgStore {
    async fn insert(&self, row: RevokedToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_hash, expires_at, reason, revoked_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(&row.token_hash)
        .bind(row.expires_at)
        .bind(row.reason.as_str())
        .bind(row.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token_hash: &str) -> StoreResult<Option<RevokedToken>> {
        let row = sqlx::query(
            r#"
            SELECT token_hash, expires_at, reason, revoked_at
            FROM revoked_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let reason: String = row.get("reason");
                Ok(Some(RevokedToken {
                    token_hash: row.get("token_hash"),
                    expires_at: row.get("expires_at"),
                    reason: reason
                        .parse()
                        .map_err(|e: String| StoreError::Configuration(e))?,
                    revoked_at: row.get("revoked_at"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
