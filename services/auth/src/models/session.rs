//! Session model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session entity
///
/// One row per logged-in device. Termination flips `is_active` to false;
/// rows are never physically deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub identity_id: Uuid,
    /// Opaque random token, unrelated to any bearer token. The boundary
    /// layer stores it as an http-only cookie.
    #[serde(skip_serializing)]
    pub session_token: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// New session creation payload
#[derive(Debug, Clone)]
pub struct NewSession {
    pub identity_id: Uuid,
    pub session_token: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Connection details captured by the boundary at login
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
