//! Process-wide configuration for the auth core
//!
//! Configuration is loaded once at process start and handed to each
//! component's constructor. Nothing in the crate reads ambient globals after
//! startup; the structs here are the only way secrets and TTLs enter the
//! system.

use anyhow::Result;

/// Signing secrets and lifetimes for tokens and sessions
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret used to sign and verify access tokens
    pub access_secret: String,
    /// Secret used to sign and verify refresh tokens, distinct from the
    /// access secret so one class of token can never pass as the other
    pub refresh_secret: String,
    /// Access token expiry in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiry in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
    /// Opaque session lifetime in seconds (default: 30 days)
    pub session_ttl: u64,
    /// Seconds between runs of the revocation-table purge (default: 1 hour).
    /// The schedule itself is owned by the hosting process.
    pub revocation_purge_interval: u64,
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_ACCESS_TOKEN_SECRET`: Access token signing secret (required)
    /// - `AUTH_REFRESH_TOKEN_SECRET`: Refresh token signing secret (required)
    /// - `AUTH_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `AUTH_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    /// - `AUTH_SESSION_TTL`: Session lifetime in seconds (default: 2592000)
    /// - `AUTH_REVOCATION_PURGE_INTERVAL`: Purge cadence in seconds (default: 3600)
    pub fn from_env() -> Result<Self> {
        let access_secret = std::env::var("AUTH_ACCESS_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("AUTH_ACCESS_TOKEN_SECRET environment variable not set"))?;

        let refresh_secret = std::env::var("AUTH_REFRESH_TOKEN_SECRET").map_err(|_| {
            anyhow::anyhow!("AUTH_REFRESH_TOKEN_SECRET environment variable not set")
        })?;

        if access_secret == refresh_secret {
            anyhow::bail!("access and refresh token secrets must differ");
        }

        let access_token_expiry = std::env::var("AUTH_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("AUTH_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        let session_ttl = std::env::var("AUTH_SESSION_TTL")
            .unwrap_or_else(|_| "2592000".to_string()) // 30 days
            .parse()
            .unwrap_or(2592000);

        let revocation_purge_interval = std::env::var("AUTH_REVOCATION_PURGE_INTERVAL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        Ok(AuthConfig {
            access_secret,
            refresh_secret,
            access_token_expiry,
            refresh_token_expiry,
            session_ttl,
            revocation_purge_interval,
        })
    }
}

/// Cost parameters and complexity floor for password hashing
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Argon2 memory cost in KiB
    pub memory_cost: u32,
    /// Argon2 iteration count
    pub time_cost: u32,
    /// Argon2 lane count
    pub parallelism: u32,
    /// Minimum accepted password length
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19_456, // 19 MiB, the OWASP-recommended Argon2id floor
            time_cost: 2,
            parallelism: 1,
            min_length: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_auth_config_defaults() {
        unsafe {
            std::env::set_var("AUTH_ACCESS_TOKEN_SECRET", "access-secret");
            std::env::set_var("AUTH_REFRESH_TOKEN_SECRET", "refresh-secret");
            std::env::remove_var("AUTH_ACCESS_TOKEN_EXPIRY");
            std::env::remove_var("AUTH_REFRESH_TOKEN_EXPIRY");
            std::env::remove_var("AUTH_SESSION_TTL");
            std::env::remove_var("AUTH_REVOCATION_PURGE_INTERVAL");
        }

        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.access_token_expiry, 900);
        assert_eq!(config.refresh_token_expiry, 604800);
        assert_eq!(config.session_ttl, 2592000);
        assert_eq!(config.revocation_purge_interval, 3600);

        unsafe {
            std::env::remove_var("AUTH_ACCESS_TOKEN_SECRET");
            std::env::remove_var("AUTH_REFRESH_TOKEN_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_auth_config_rejects_shared_secret() {
        unsafe {
            std::env::set_var("AUTH_ACCESS_TOKEN_SECRET", "same");
            std::env::set_var("AUTH_REFRESH_TOKEN_SECRET", "same");
        }

        assert!(AuthConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("AUTH_ACCESS_TOKEN_SECRET");
            std::env::remove_var("AUTH_REFRESH_TOKEN_SECRET");
        }
    }

    #[test]
    fn test_password_config_default_floor() {
        let config = PasswordConfig::default();
        assert_eq!(config.memory_cost, 19_456);
        assert_eq!(config.time_cost, 2);
        assert_eq!(config.min_length, 8);
    }
}
