//! Aggregate root and ownership traits shared by User, Schedule and Comment.

use crate::id::UserId;
use crate::time::Timestamps;

/// Aggregate root marker + minimal interface.
///
/// Aggregates are plain data: they never touch storage. Timestamps are
/// assigned by the persistence boundary and only read here.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Creation / last-modification instants as recorded by the store.
    fn timestamps(&self) -> &Timestamps;
}

/// A resource with a recorded owner.
///
/// `None` only arises from corrupted rows (the relational schema forbids it);
/// the ownership guard treats it as an invariant violation, never as "public".
pub trait Owned {
    fn owner_id(&self) -> Option<UserId>;
}
