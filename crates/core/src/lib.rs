//! `scheduler-core`: domain foundation shared by every board crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, aggregate/ownership traits and the partial
//! update helper.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod patch;
pub mod time;
pub mod validate;

pub use aggregate::{AggregateRoot, Owned};
pub use error::{DomainError, DomainResult, FieldErrors, Resource};
pub use id::{CommentId, ScheduleId, UserId};
pub use patch::overwrite;
pub use time::Timestamps;
pub use validate::FieldValidator;
