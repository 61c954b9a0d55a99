//! Authentication and session-lifecycle core for the Inkpress publishing
//! platform
//!
//! The crate covers credential verification (with transparent upgrade of
//! legacy password records), bearer-token issuance and validation,
//! multi-device session tracking, and a token-hash denylist that supports
//! logout despite tokens being otherwise stateless. Content CRUD, rendering,
//! HTTP routing, and cookie management live in other services; this crate
//! only exposes the flows they compose.

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod password;
pub mod revocation;
pub mod session;
pub mod store;
pub mod token;
pub mod validation;

pub use config::{AuthConfig, PasswordConfig};
pub use error::{AuthError, AuthResult};
pub use orchestrator::{AuthOrchestrator, LoginOutcome};
pub use password::PasswordService;
pub use revocation::RevocationService;
pub use session::SessionManager;
pub use token::{TokenPair, TokenService};
