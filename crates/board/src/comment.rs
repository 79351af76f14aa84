use serde::{Deserialize, Serialize};

use scheduler_core::{
    overwrite, AggregateRoot, CommentId, DomainError, DomainResult, Owned, ScheduleId, Timestamps,
    UserId,
};

/// Upper bound on comment length (characters).
pub const MAX_COMMENT_LEN: usize = 100;

/// Aggregate root: Comment on a schedule.
///
/// # Invariants
/// - `owner_id` and `schedule_id` reference existing aggregates and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub owner_id: UserId,
    pub schedule_id: ScheduleId,
    pub content: String,
    pub timestamps: Timestamps,
}

/// An unsaved comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub id: CommentId,
    pub owner_id: UserId,
    pub schedule_id: ScheduleId,
    pub content: String,
}

impl NewComment {
    pub fn new(owner_id: UserId, schedule_id: ScheduleId, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            owner_id,
            schedule_id,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentChanges {
    pub content: Option<String>,
}

impl CommentChanges {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

impl Comment {
    pub fn apply(mut self, changes: CommentChanges) -> Self {
        overwrite(&mut self.content, changes.content);
        self
    }

    /// Fail with `CommentScheduleMismatch` unless this comment sits under `schedule_id`.
    pub fn ensure_under(&self, schedule_id: ScheduleId) -> DomainResult<()> {
        if self.schedule_id == schedule_id {
            Ok(())
        } else {
            Err(DomainError::CommentScheduleMismatch)
        }
    }
}

impl AggregateRoot for Comment {
    type Id = CommentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.owner_id)
    }
}
