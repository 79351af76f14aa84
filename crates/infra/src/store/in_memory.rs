//! In-memory board store.
//!
//! Intended for tests/dev. Behaves like the relational schema: foreign keys
//! without cascading, a unique email index, and units of work that are
//! all-or-nothing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

use scheduler_auth::{CredentialStore, NewUser, User};
use scheduler_board::{Comment, NewComment, NewSchedule, Page, PageRequest, Schedule, ScheduleSummary};
use scheduler_core::{CommentId, DomainResult, Resource, ScheduleId, Timestamps, UserId};

use super::{BoardStore, BoardTx, StoreError, StoreResult};

/// Unit-of-work steps, for failure injection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxStep {
    DeleteCommentsByOwner,
    DeleteCommentsUnderSchedulesOf,
    DeleteCommentsBySchedule,
    DeleteSchedulesByOwner,
    DeleteSchedule,
    DeleteUser,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct BoardState {
    users: HashMap<UserId, User>,
    schedules: HashMap<ScheduleId, Schedule>,
    comments: HashMap<CommentId, Comment>,
}

impl BoardState {
    fn email_taken_by_other(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn summarize(&self, schedule: &Schedule) -> StoreResult<ScheduleSummary> {
        let owner = self.users.get(&schedule.owner_id).ok_or_else(|| {
            StoreError::Corrupt(format!("schedule {} has no owner row", schedule.id))
        })?;
        let comment_count = self
            .comments
            .values()
            .filter(|c| c.schedule_id == schedule.id)
            .count() as u64;

        Ok(ScheduleSummary {
            id: schedule.id,
            owner_id: schedule.owner_id,
            user_name: owner.name.clone(),
            title: schedule.title.clone(),
            content: schedule.content.clone(),
            comment_count,
            created_at: schedule.timestamps.created_at,
            modified_at: schedule.timestamps.modified_at,
        })
    }
}

/// Newest first; ties broken by id so paging is stable.
fn newest_first<T, I: Ord>(items: &mut [T], key: impl Fn(&T) -> (Timestamps, I)) {
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        tb.modified_at.cmp(&ta.modified_at).then_with(|| ib.cmp(&ia))
    });
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBoardStore {
    state: Arc<RwLock<BoardState>>,
    fail_on: Arc<Mutex<Option<TxStep>>>,
}

impl InMemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent unit of work fail at `step` (test hook).
    pub async fn inject_failure(&self, step: Option<TxStep>) {
        *self.fail_on.lock().await = step;
    }

    /// Row counts `(users, schedules, comments)`.
    pub async fn counts(&self) -> (usize, usize, usize) {
        let state = self.state.read().await;
        (state.users.len(), state.schedules.len(), state.comments.len())
    }
}

#[async_trait]
impl CredentialStore for InMemoryBoardStore {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        Ok(self.state.read().await.email_taken_by_other(email, None))
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        newest_first(&mut users, |u| (u.timestamps, u.id));
        Ok(users)
    }

    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken_by_other(&new.email, None) {
            return Err(StoreError::UniqueViolation { email: new.email });
        }

        let user = User {
            id: new.id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            timestamps: Timestamps::at(Utc::now()),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken_by_other(&user.email, Some(user.id)) {
            return Err(StoreError::UniqueViolation { email: user.email });
        }

        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::NotFound(Resource::User))?;
        let timestamps = stored.timestamps.touched(Utc::now());
        *stored = User { timestamps, ..user };
        Ok(stored.clone())
    }

    async fn find_schedule(&self, id: ScheduleId) -> StoreResult<Option<Schedule>> {
        Ok(self.state.read().await.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self, request: PageRequest) -> StoreResult<Page<ScheduleSummary>> {
        let state = self.state.read().await;
        let mut matching: Vec<&Schedule> = state
            .schedules
            .values()
            .filter(|s| request.user_id.is_none_or(|owner| s.owner_id == owner))
            .collect();
        newest_first(&mut matching, |s| (s.timestamps, s.id));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .map(|s| state.summarize(s))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(items, &request, total))
    }

    async fn insert_schedule(&self, new: NewSchedule) -> StoreResult<Schedule> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.owner_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "schedule owner {} does not exist",
                new.owner_id
            )));
        }

        let schedule = Schedule {
            id: new.id,
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            timestamps: Timestamps::at(Utc::now()),
        };
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(&self, schedule: Schedule) -> StoreResult<Schedule> {
        let mut state = self.state.write().await;
        let stored = state
            .schedules
            .get_mut(&schedule.id)
            .ok_or(StoreError::NotFound(Resource::Schedule))?;

        *stored = Schedule {
            owner_id: stored.owner_id,
            timestamps: stored.timestamps.touched(Utc::now()),
            ..schedule
        };
        Ok(stored.clone())
    }

    async fn find_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state
            .read()
            .await
            .comments
            .values()
            .filter(|c| c.schedule_id == schedule_id)
            .cloned()
            .collect();
        newest_first(&mut comments, |c| (c.timestamps, c.id));
        Ok(comments)
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.owner_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "comment owner {} does not exist",
                new.owner_id
            )));
        }
        if !state.schedules.contains_key(&new.schedule_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "comment schedule {} does not exist",
                new.schedule_id
            )));
        }

        let comment = Comment {
            id: new.id,
            owner_id: new.owner_id,
            schedule_id: new.schedule_id,
            content: new.content,
            timestamps: Timestamps::at(Utc::now()),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        let stored = state
            .comments
            .get_mut(&comment.id)
            .ok_or(StoreError::NotFound(Resource::Comment))?;

        *stored = Comment {
            owner_id: stored.owner_id,
            schedule_id: stored.schedule_id,
            timestamps: stored.timestamps.touched(Utc::now()),
            ..comment
        };
        Ok(stored.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> StoreResult<bool> {
        Ok(self.state.write().await.comments.remove(&id).is_some())
    }

    async fn begin(&self) -> StoreResult<Box<dyn BoardTx>> {
        let fail_on = *self.fail_on.lock().await;
        let guard = self.state.clone().write_owned().await;
        let snapshot = Some((*guard).clone());
        Ok(Box::new(InMemoryTx {
            guard,
            snapshot,
            fail_on,
        }))
    }
}

/// Holds the write lock for its whole lifetime, so no other request observes
/// intermediate state. Restores the snapshot on drop unless committed.
struct InMemoryTx {
    guard: OwnedRwLockWriteGuard<BoardState>,
    snapshot: Option<BoardState>,
    fail_on: Option<TxStep>,
}

impl InMemoryTx {
    fn step(&self, step: TxStep) -> StoreResult<()> {
        if self.fail_on == Some(step) {
            return Err(StoreError::Backend(format!("injected failure at {step:?}")));
        }
        Ok(())
    }

    fn remove_comments(&mut self, keep: impl Fn(&Comment) -> bool) -> u64 {
        let before = self.guard.comments.len();
        self.guard.comments.retain(|_, c| keep(c));
        (before - self.guard.comments.len()) as u64
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl BoardTx for InMemoryTx {
    async fn delete_comments_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.step(TxStep::DeleteCommentsByOwner)?;
        Ok(self.remove_comments(|c| c.owner_id != owner_id))
    }

    async fn delete_comments_under_schedules_of(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.step(TxStep::DeleteCommentsUnderSchedulesOf)?;
        let schedules = self.guard.schedules.clone();
        Ok(self.remove_comments(|c| {
            schedules
                .get(&c.schedule_id)
                .is_none_or(|s| s.owner_id != owner_id)
        }))
    }

    async fn delete_comments_by_schedule(&mut self, schedule_id: ScheduleId) -> StoreResult<u64> {
        self.step(TxStep::DeleteCommentsBySchedule)?;
        Ok(self.remove_comments(|c| c.schedule_id != schedule_id))
    }

    async fn delete_schedules_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.step(TxStep::DeleteSchedulesByOwner)?;
        let doomed: Vec<ScheduleId> = self
            .guard
            .schedules
            .values()
            .filter(|s| s.owner_id == owner_id)
            .map(|s| s.id)
            .collect();
        if self.guard.comments.values().any(|c| doomed.contains(&c.schedule_id)) {
            return Err(StoreError::ForeignKeyViolation(
                "schedules still referenced by comments".to_string(),
            ));
        }
        for id in &doomed {
            self.guard.schedules.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn delete_schedule(&mut self, id: ScheduleId) -> StoreResult<bool> {
        self.step(TxStep::DeleteSchedule)?;
        if self.guard.comments.values().any(|c| c.schedule_id == id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "schedule {id} still referenced by comments"
            )));
        }
        Ok(self.guard.schedules.remove(&id).is_some())
    }

    async fn delete_user(&mut self, id: UserId) -> StoreResult<bool> {
        self.step(TxStep::DeleteUser)?;
        let referenced = self.guard.schedules.values().any(|s| s.owner_id == id)
            || self.guard.comments.values().any(|c| c.owner_id == id);
        if referenced {
            return Err(StoreError::ForeignKeyViolation(format!(
                "user {id} still referenced by schedules or comments"
            )));
        }
        Ok(self.guard.users.remove(&id).is_some())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.step(TxStep::Commit)?;
        self.snapshot = None;
        Ok(())
    }
}
