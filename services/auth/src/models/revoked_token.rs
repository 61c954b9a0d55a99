//! Revoked-token model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a token landed on the denylist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Logout,
    Rotation,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::Rotation => "rotation",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logout" => Ok(RevocationReason::Logout),
            "rotation" => Ok(RevocationReason::Rotation),
            other => Err(format!("unknown revocation reason: {}", other)),
        }
    }
}

/// Denylist entry
///
/// Only the SHA-256 hash of the token is stored, never the raw value.
/// `expires_at` is copied from the token's own expiry; lookups ignore rows
/// past it even before a physical purge runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub reason: RevocationReason,
    pub revoked_at: DateTime<Utc>,
}
