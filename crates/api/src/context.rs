use scheduler_auth::SessionId;
use scheduler_core::UserId;

/// The authenticated user of a request.
///
/// Inserted by the session gate; present on every non-allow-listed route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionUser {
    user_id: UserId,
}

impl SessionUser {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// The session id the request carried, if any (bound or not).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PresentedSession(pub Option<SessionId>);
