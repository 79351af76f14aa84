//! Cascading deletion of users and schedules.
//!
//! Each deletion runs as one unit of work: children first, then the parent,
//! then commit. A failing step drops the unit of work, which rolls back every
//! step before it.

use std::sync::Arc;

use tracing::instrument;

use scheduler_auth::SessionStore;
use scheduler_core::{DomainError, DomainResult, Resource, ScheduleId, UserId};

use crate::store::{BoardStore, BoardTx, StoreError};

/// What a committed user deletion removed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UserDeletion {
    pub comments: u64,
    pub schedules: u64,
    pub sessions: usize,
}

/// What a committed schedule deletion removed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDeletion {
    pub comments: u64,
}

#[derive(Clone)]
pub struct CascadingDeletionCoordinator {
    store: Arc<dyn BoardStore>,
    sessions: Arc<dyn SessionStore>,
}

impl CascadingDeletionCoordinator {
    pub fn new(store: Arc<dyn BoardStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Delete a user with every comment they wrote, every schedule they own,
    /// and every comment under those schedules; then drop their sessions.
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn delete_user(&self, user_id: UserId) -> DomainResult<UserDeletion> {
        let mut tx = self.store.begin().await.map_err(|e| rolled_back("user", e))?;

        let steps = async {
            let own_comments = tx.delete_comments_by_owner(user_id).await?;
            let foreign_comments = tx.delete_comments_under_schedules_of(user_id).await?;
            let schedules = tx.delete_schedules_by_owner(user_id).await?;
            let found = tx.delete_user(user_id).await?;
            Ok::<_, StoreError>((found, own_comments + foreign_comments, schedules))
        }
        .await;

        let (comments, schedules) = match steps {
            Ok((true, comments, schedules)) => (comments, schedules),
            Ok((false, ..)) => return Err(DomainError::not_found(Resource::User)),
            Err(e) => return Err(rolled_back("user", e)),
        };
        commit(tx, "user").await?;

        let sessions = self.sessions.invalidate_user(user_id);
        tracing::info!(comments, schedules, sessions, "user deleted");
        Ok(UserDeletion {
            comments,
            schedules,
            sessions,
        })
    }

    /// Delete a schedule and every comment under it.
    #[instrument(skip(self), fields(schedule_id = %schedule_id), err)]
    pub async fn delete_schedule(&self, schedule_id: ScheduleId) -> DomainResult<ScheduleDeletion> {
        let mut tx = self.store.begin().await.map_err(|e| rolled_back("schedule", e))?;

        let steps = async {
            let comments = tx.delete_comments_by_schedule(schedule_id).await?;
            let found = tx.delete_schedule(schedule_id).await?;
            Ok::<_, StoreError>((found, comments))
        }
        .await;

        let comments = match steps {
            Ok((true, comments)) => comments,
            Ok((false, _)) => return Err(DomainError::not_found(Resource::Schedule)),
            Err(e) => return Err(rolled_back("schedule", e)),
        };
        commit(tx, "schedule").await?;

        tracing::info!(comments, "schedule deleted");
        Ok(ScheduleDeletion { comments })
    }
}

async fn commit(tx: Box<dyn BoardTx>, what: &str) -> DomainResult<()> {
    tx.commit().await.map_err(|e| rolled_back(what, e))
}

fn rolled_back(what: &str, err: StoreError) -> DomainError {
    tracing::warn!(error = %err, "{what} deletion rolled back");
    DomainError::internal(format!("{what} deletion failed: {err}"))
}
