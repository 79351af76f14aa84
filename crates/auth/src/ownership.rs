//! Single-owner authorization for mutations and deletions.
//!
//! Every mutate/delete path (schedule, comment, user self-service) goes
//! through [`OwnershipGuard`]; there is no other permission model.
//!
//! - No IO
//! - No panics
//! - No side effects (pure decision)

use scheduler_core::{DomainError, DomainResult, Owned, UserId};

const DEFAULT_DENIAL: &str = "access denied";

/// Pure ownership decision function.
#[derive(Debug, Copy, Clone, Default)]
pub struct OwnershipGuard;

impl OwnershipGuard {
    /// Allow iff the recorded owner is the acting user.
    ///
    /// A missing owner is an invariant violation, never an implicit grant.
    pub fn authorize(resource_owner: Option<UserId>, acting_user: UserId) -> DomainResult<()> {
        Self::authorize_with(resource_owner, acting_user, DEFAULT_DENIAL)
    }

    /// Same as [`authorize`](Self::authorize) with a caller-specific denial message.
    pub fn authorize_with(
        resource_owner: Option<UserId>,
        acting_user: UserId,
        denial: &str,
    ) -> DomainResult<()> {
        match resource_owner {
            None => Err(DomainError::invariant("resource has no recorded owner")),
            Some(owner) if owner == acting_user => Ok(()),
            Some(_) => Err(DomainError::forbidden(denial)),
        }
    }

    pub fn authorize_resource<R: Owned>(
        resource: &R,
        acting_user: UserId,
        denial: &str,
    ) -> DomainResult<()> {
        Self::authorize_with(resource.owner_id(), acting_user, denial)
    }
}
