//! Server-side session bindings (session id → user id).
//!
//! A session moves through three states:
//!
//! ```text
//! NoSession ──open──▶ SessionWithoutUser ──bind (login)──▶ SessionWithUser
//!     ▲                        │                                 │
//!     └──────── invalidate ────┴──────────── invalidate ─────────┘
//! ```
//!
//! Only a successful login binds a user; logout, user deletion, idle expiry
//! and the gate's stale-session cleanup invalidate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

use scheduler_core::UserId;

/// Opaque, unguessable session identifier (random UUIDv4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied identifier; garbage yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::try_parse(raw.trim()).ok().map(Self)
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0.simple(), f)
    }
}

/// Observable state of a (possibly absent) session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    SessionWithoutUser,
    SessionWithUser(UserId),
}

/// Session store abstraction injected into the gate and the credential verifier.
pub trait SessionStore: Send + Sync {
    /// Create a fresh session with no user bound.
    fn open(&self) -> SessionId;

    /// Bind `user_id` to `id`, creating the session if needed.
    fn bind(&self, id: SessionId, user_id: UserId);

    /// The bound user, if the session exists and is bound.
    fn lookup(&self, id: &SessionId) -> Option<UserId>;

    fn contains(&self, id: &SessionId) -> bool;

    /// Destroy a session. Unknown ids are ignored.
    fn invalidate(&self, id: &SessionId);

    /// Destroy every session bound to `user_id`; returns how many were removed.
    fn invalidate_user(&self, user_id: UserId) -> usize;

    fn state(&self, id: Option<&SessionId>) -> SessionState {
        let Some(id) = id else {
            return SessionState::NoSession;
        };
        match self.lookup(id) {
            Some(user_id) => SessionState::SessionWithUser(user_id),
            None if self.contains(id) => SessionState::SessionWithoutUser,
            None => SessionState::NoSession,
        }
    }
}

impl<S> SessionStore for std::sync::Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn open(&self) -> SessionId {
        (**self).open()
    }

    fn bind(&self, id: SessionId, user_id: UserId) {
        (**self).bind(id, user_id)
    }

    fn lookup(&self, id: &SessionId) -> Option<UserId> {
        (**self).lookup(id)
    }

    fn contains(&self, id: &SessionId) -> bool {
        (**self).contains(id)
    }

    fn invalidate(&self, id: &SessionId) {
        (**self).invalidate(id)
    }

    fn invalidate_user(&self, user_id: UserId) -> usize {
        (**self).invalidate_user(user_id)
    }
}

/// Idle lifetime of a session when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Copy, Clone)]
struct Entry {
    /// `None` marks an opened but unbound session.
    user: Option<UserId>,
    last_seen: Instant,
}

/// In-process session store with an idle timeout.
///
/// Expired entries are evicted lazily: a lookup of an expired id removes it,
/// and every `open` sweeps the whole map.
#[derive(Debug)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<SessionId, Entry>>,
    idle_timeout: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Number of stored sessions, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) >= self.idle_timeout
    }

    /// Touch a live entry, evicting it if it has expired.
    fn live_entry(&self, id: &SessionId) -> Option<Entry> {
        let now = Instant::now();
        let mut map = self.inner.write();
        let entry = map.get_mut(id)?;
        if self.expired(entry, now) {
            map.remove(id);
            return None;
        }
        entry.last_seen = now;
        Some(*entry)
    }
}

impl SessionStore for InMemorySessionStore {
    fn open(&self) -> SessionId {
        let id = SessionId::random();
        let now = Instant::now();
        let mut map = self.inner.write();
        let before = map.len();
        map.retain(|_, entry| !self.expired(entry, now));
        if map.len() < before {
            tracing::debug!(evicted = before - map.len(), "expired sessions evicted");
        }
        map.insert(id, Entry { user: None, last_seen: now });
        id
    }

    fn bind(&self, id: SessionId, user_id: UserId) {
        self.inner.write().insert(
            id,
            Entry {
                user: Some(user_id),
                last_seen: Instant::now(),
            },
        );
    }

    fn lookup(&self, id: &SessionId) -> Option<UserId> {
        self.live_entry(id).and_then(|entry| entry.user)
    }

    fn contains(&self, id: &SessionId) -> bool {
        self.live_entry(id).is_some()
    }

    fn invalidate(&self, id: &SessionId) {
        self.inner.write().remove(id);
    }

    fn invalidate_user(&self, user_id: UserId) -> usize {
        let mut map = self.inner.write();
        let before = map.len();
        map.retain(|_, entry| entry.user != Some(user_id));
        before - map.len()
    }
}

/// The session a request arrived with, plus the store to act on it.
pub struct SessionContext<'a> {
    pub sessions: &'a dyn SessionStore,
    pub current: Option<SessionId>,
}

impl<'a> SessionContext<'a> {
    pub fn new(sessions: &'a dyn SessionStore, current: Option<SessionId>) -> Self {
        Self { sessions, current }
    }

    /// Bind `user_id` to a freshly issued session id.
    ///
    /// Any session the request arrived with is destroyed first, so a
    /// pre-login identifier is never promoted to an authenticated one.
    pub fn establish(&self, user_id: UserId) -> SessionId {
        if let Some(old) = &self.current {
            self.sessions.invalidate(old);
        }
        let id = self.sessions.open();
        self.sessions.bind(id, user_id);
        id
    }

    /// Logout: drop the request's session, if any.
    pub fn end(&self) {
        if let Some(id) = &self.current {
            self.sessions.invalidate(id);
        }
    }
}
