//! `scheduler-auth`: authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: credential
//! lookups go through [`CredentialStore`], session bindings through
//! [`SessionStore`]. The API layer adapts both to the wire.

pub mod credentials;
pub mod gate;
pub mod ownership;
pub mod password;
pub mod session;
pub mod user;

pub use credentials::{CredentialStore, CredentialVerifier};
pub use gate::{GateDecision, SessionAuthGate, ALLOW_LIST};
pub use ownership::OwnershipGuard;
pub use password::PasswordHash;
pub use session::{
    InMemorySessionStore, SessionContext, SessionId, SessionState, SessionStore, DEFAULT_IDLE_TIMEOUT,
};
pub use user::{normalize_email, NewUser, User, UserChanges, MAX_NAME_LEN};
