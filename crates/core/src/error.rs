//! Domain error model.

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Field name → first validation message for that field.
pub type FieldErrors = BTreeMap<String, String>;

/// The kind of aggregate a failure refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    Schedule,
    Comment,
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Resource::User => f.write_str("user"),
            Resource::Schedule => f.write_str("schedule"),
            Resource::Comment => f.write_str("comment"),
        }
    }
}

/// Domain-level error.
///
/// Every guard, verifier and service in the workspace fails with one of these
/// variants. The HTTP boundary maps each variant to exactly one status and
/// stable error code; nothing below the boundary knows about HTTP.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields were malformed or out of bounds.
    #[error("validation failed: {}", describe_fields(.0))]
    Validation(FieldErrors),

    /// The request carries no session, or the session is not bound to a user.
    #[error("login required")]
    LoginRequired,

    /// No account is registered under the supplied email.
    #[error("no account is registered for this email")]
    UnknownAccount,

    /// The supplied password does not match the stored credential.
    #[error("password is incorrect")]
    PasswordIncorrect,

    /// A password change was requested with the current password.
    #[error("new password is the same as the current password")]
    PasswordSameAsOld,

    /// The acting user does not own the resource.
    #[error("forbidden: {0}")]
    ForbiddenNotOwner(String),

    /// Another user already holds this email.
    #[error("email already in use: {0}")]
    DuplicateCredential(String),

    /// The referenced aggregate does not exist.
    #[error("{0} not found")]
    NotFound(Resource),

    /// A comment was addressed through a schedule it does not belong to.
    #[error("comment does not belong to the requested schedule")]
    CommentScheduleMismatch,

    /// Page/size parameters are out of range.
    #[error("invalid paging parameters: {0}")]
    InvalidPaging(String),

    /// A domain invariant was violated (e.g. a resource without an owner).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Unexpected failure below the domain (storage, hashing backend, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DomainError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), msg.into());
        Self::Validation(fields)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::validation("id", msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::ForbiddenNotOwner(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found(resource: Resource) -> Self {
        Self::NotFound(resource)
    }
}
