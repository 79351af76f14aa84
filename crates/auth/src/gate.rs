//! Session authentication gate (transport-agnostic decision logic).
//!
//! The HTTP middleware extracts the request path and the presented session
//! id, asks the gate, and acts on the [`GateDecision`].

use std::sync::Arc;

use scheduler_core::UserId;

use crate::session::{SessionId, SessionState, SessionStore};

/// Paths reachable without an authenticated session (exact match).
pub const ALLOW_LIST: [&str; 4] = ["/", "/signup", "/login", "/logout"];

pub fn is_allow_listed(path: &str) -> bool {
    ALLOW_LIST.contains(&path)
}

/// Outcome of running a request through the gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Allow-listed path; no session required.
    Public,
    /// Bound session; the user id must be attached to the request.
    Authenticated(UserId),
    /// Protected path without a bound session. Any stale session has already
    /// been invalidated; carries the state the request arrived in.
    Rejected(SessionState),
}

/// Gate over an injected session store.
#[derive(Clone)]
pub struct SessionAuthGate {
    sessions: Arc<dyn SessionStore>,
}

impl SessionAuthGate {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Decide whether a request for `path` carrying `session` may proceed.
    pub fn admit(&self, path: &str, session: Option<SessionId>) -> GateDecision {
        if is_allow_listed(path) {
            return GateDecision::Public;
        }

        match self.sessions.state(session.as_ref()) {
            SessionState::SessionWithUser(user_id) => GateDecision::Authenticated(user_id),
            state => {
                if let (SessionState::SessionWithoutUser, Some(id)) = (state, session.as_ref()) {
                    self.sessions.invalidate(id);
                }
                tracing::warn!(path, ?state, "rejected request without authenticated session");
                GateDecision::Rejected(state)
            }
        }
    }
}
