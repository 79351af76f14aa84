//! User aggregate for identity management.
//!
//! Users are created unsaved by the credential verifier and persisted by the
//! credential store, which assigns the audit timestamps.

use serde::{Deserialize, Serialize};

use scheduler_core::{overwrite, AggregateRoot, Owned, Timestamps, UserId};

use crate::PasswordHash;

/// Upper bound on display name length (characters).
pub const MAX_NAME_LEN: usize = 20;

/// Normalize an email for storage and lookup (trimmed, lowercase).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted user.
///
/// # Invariants
/// - `email` is normalized and unique across all users (enforced by the store).
/// - `password_hash` is never the raw password.
/// - `id` and `timestamps.created_at` never change after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub timestamps: Timestamps,
}

/// A user aggregate that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

/// Partial update for a user; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<PasswordHash>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

impl User {
    /// Produce the next version of this user with `changes` applied.
    ///
    /// Timestamps are left as-is; the store advances `modified_at` on write.
    pub fn apply(mut self, changes: UserChanges) -> Self {
        overwrite(&mut self.name, changes.name.map(|n| n.trim().to_string()));
        overwrite(&mut self.email, changes.email.as_deref().map(normalize_email));
        overwrite(&mut self.password_hash, changes.password_hash);
        self
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

/// A user is the owner of its own account (self-service operations).
impl Owned for User {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.id)
    }
}
