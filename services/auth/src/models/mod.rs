//! Auth core models

pub mod identity;
pub mod revoked_token;
pub mod session;

// Re-export for convenience
pub use identity::{Identity, NewIdentity, Role};
pub use revoked_token::{RevocationReason, RevokedToken};
pub use session::{DeviceInfo, NewSession, Session};
