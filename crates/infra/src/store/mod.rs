//! Persistence boundary for users, schedules and comments.
//!
//! `BoardStore` covers reads and single-row writes; multi-row deletions run
//! inside a [`BoardTx`] unit of work obtained from [`BoardStore::begin`].
//! Stores assign audit timestamps: `created_at` on insert and a strictly
//! increasing `modified_at` on every update.

use async_trait::async_trait;
use thiserror::Error;

use scheduler_auth::{CredentialStore, NewUser, User};
use scheduler_board::{Comment, NewComment, NewSchedule, Page, PageRequest, Schedule, ScheduleSummary};
use scheduler_core::{CommentId, DomainError, Resource, ScheduleId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryBoardStore, TxStep};
pub use postgres::PostgresBoardStore;

/// Errors raised by a store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another user already holds this email.
    #[error("email already in use: {email}")]
    UniqueViolation { email: String },

    /// A row references a missing parent, or a parent still has children.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// An update targeted a row that no longer exists.
    #[error("{0} not found")]
    NotFound(Resource),

    /// Stored data contradicts the schema (e.g. a schedule without its owner).
    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { email } => DomainError::DuplicateCredential(email),
            StoreError::NotFound(resource) => DomainError::NotFound(resource),
            StoreError::Corrupt(msg) => DomainError::InvariantViolation(msg),
            other => DomainError::Internal(other.to_string()),
        }
    }
}

/// Storage collaborator for the whole board.
///
/// Listings are ordered by `modified_at` descending.
#[async_trait]
pub trait BoardStore: CredentialStore {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    /// Persist `user`'s mutable fields (last write wins).
    async fn update_user(&self, user: User) -> StoreResult<User>;

    async fn find_schedule(&self, id: ScheduleId) -> StoreResult<Option<Schedule>>;
    async fn list_schedules(&self, request: PageRequest) -> StoreResult<Page<ScheduleSummary>>;
    async fn insert_schedule(&self, new: NewSchedule) -> StoreResult<Schedule>;
    async fn update_schedule(&self, schedule: Schedule) -> StoreResult<Schedule>;

    async fn find_comment(&self, id: CommentId) -> StoreResult<Option<Comment>>;
    async fn list_comments(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Comment>>;
    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment>;
    async fn update_comment(&self, comment: Comment) -> StoreResult<Comment>;
    /// Returns `false` if no such comment existed.
    async fn delete_comment(&self, id: CommentId) -> StoreResult<bool>;

    /// Open a unit of work. Dropping it without [`BoardTx::commit`] rolls back.
    async fn begin(&self) -> StoreResult<Box<dyn BoardTx>>;
}

/// Delete steps of a unit of work. Parents with remaining children cannot be
/// deleted, so callers must remove children first.
#[async_trait]
pub trait BoardTx: Send {
    async fn delete_comments_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64>;
    async fn delete_comments_under_schedules_of(&mut self, owner_id: UserId) -> StoreResult<u64>;
    async fn delete_comments_by_schedule(&mut self, schedule_id: ScheduleId) -> StoreResult<u64>;
    async fn delete_schedules_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64>;
    async fn delete_schedule(&mut self, id: ScheduleId) -> StoreResult<bool>;
    async fn delete_user(&mut self, id: UserId) -> StoreResult<bool>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
