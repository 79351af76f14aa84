use std::sync::Arc;

use tracing::instrument;

use scheduler_auth::OwnershipGuard;
use scheduler_board::{Comment, CommentChanges, NewComment};
use scheduler_core::{CommentId, DomainError, DomainResult, Resource, ScheduleId, UserId};

use crate::store::BoardStore;

const NOT_YOUR_COMMENT: &str = "you can only modify your own comments";

/// Comments are always addressed through their schedule.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn BoardStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }

    async fn ensure_schedule(&self, schedule_id: ScheduleId) -> DomainResult<()> {
        match self.store.find_schedule(schedule_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found(Resource::Schedule)),
        }
    }

    #[instrument(skip(self, content), fields(acting = %acting, schedule_id = %schedule_id), err)]
    pub async fn create(&self, acting: UserId, schedule_id: ScheduleId, content: String) -> DomainResult<Comment> {
        self.ensure_schedule(schedule_id).await?;
        if self.store.find_user(acting).await?.is_none() {
            return Err(DomainError::not_found(Resource::User));
        }
        let comment = self
            .store
            .insert_comment(NewComment::new(acting, schedule_id, content))
            .await?;
        tracing::info!(comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    pub async fn list(&self, schedule_id: ScheduleId) -> DomainResult<Vec<Comment>> {
        self.ensure_schedule(schedule_id).await?;
        Ok(self.store.list_comments(schedule_id).await?)
    }

    /// Load a comment, insisting it belongs to `schedule_id`.
    pub async fn get(&self, schedule_id: ScheduleId, id: CommentId) -> DomainResult<Comment> {
        self.ensure_schedule(schedule_id).await?;
        let comment = self
            .store
            .find_comment(id)
            .await?
            .ok_or(DomainError::not_found(Resource::Comment))?;
        comment.ensure_under(schedule_id)?;
        Ok(comment)
    }

    /// An empty patch leaves the comment and its `modified_at` untouched.
    #[instrument(skip(self, changes), fields(acting = %acting, comment_id = %id), err)]
    pub async fn update(
        &self,
        acting: UserId,
        schedule_id: ScheduleId,
        id: CommentId,
        changes: CommentChanges,
    ) -> DomainResult<Comment> {
        let comment = self.get(schedule_id, id).await?;
        OwnershipGuard::authorize_resource(&comment, acting, NOT_YOUR_COMMENT)?;
        if changes.is_empty() {
            return Ok(comment);
        }
        Ok(self.store.update_comment(comment.apply(changes)).await?)
    }

    #[instrument(skip(self), fields(acting = %acting, comment_id = %id), err)]
    pub async fn delete(&self, acting: UserId, schedule_id: ScheduleId, id: CommentId) -> DomainResult<()> {
        let comment = self.get(schedule_id, id).await?;
        OwnershipGuard::authorize_resource(&comment, acting, NOT_YOUR_COMMENT)?;
        if !self.store.delete_comment(comment.id).await? {
            return Err(DomainError::not_found(Resource::Comment));
        }
        tracing::info!("comment deleted");
        Ok(())
    }
}
