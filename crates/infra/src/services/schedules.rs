use std::sync::Arc;

use tracing::instrument;

use scheduler_auth::OwnershipGuard;
use scheduler_board::{NewSchedule, Page, PageRequest, Schedule, ScheduleChanges, ScheduleSummary};
use scheduler_core::{DomainError, DomainResult, Resource, ScheduleId, UserId};

use crate::cascade::{CascadingDeletionCoordinator, ScheduleDeletion};
use crate::store::BoardStore;

const NOT_YOUR_SCHEDULE: &str = "you can only modify your own schedules";

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn BoardStore>,
    cascade: CascadingDeletionCoordinator,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn BoardStore>, cascade: CascadingDeletionCoordinator) -> Self {
        Self { store, cascade }
    }

    #[instrument(skip(self, title, content), fields(acting = %acting), err)]
    pub async fn create(&self, acting: UserId, title: String, content: String) -> DomainResult<Schedule> {
        if self.store.find_user(acting).await?.is_none() {
            return Err(DomainError::not_found(Resource::User));
        }
        let schedule = self
            .store
            .insert_schedule(NewSchedule::new(acting, title, content))
            .await?;
        tracing::info!(schedule_id = %schedule.id, "schedule created");
        Ok(schedule)
    }

    pub async fn list(&self, request: PageRequest) -> DomainResult<Page<ScheduleSummary>> {
        request.validate()?;
        Ok(self.store.list_schedules(request).await?)
    }

    pub async fn get(&self, id: ScheduleId) -> DomainResult<Schedule> {
        self.store
            .find_schedule(id)
            .await?
            .ok_or(DomainError::not_found(Resource::Schedule))
    }

    /// An empty patch leaves the schedule and its `modified_at` untouched.
    #[instrument(skip(self, changes), fields(acting = %acting, schedule_id = %id), err)]
    pub async fn update(
        &self,
        acting: UserId,
        id: ScheduleId,
        changes: ScheduleChanges,
    ) -> DomainResult<Schedule> {
        let schedule = self.get(id).await?;
        OwnershipGuard::authorize_resource(&schedule, acting, NOT_YOUR_SCHEDULE)?;
        if changes.is_empty() {
            return Ok(schedule);
        }
        Ok(self.store.update_schedule(schedule.apply(changes)).await?)
    }

    #[instrument(skip(self), fields(acting = %acting, schedule_id = %id), err)]
    pub async fn delete(&self, acting: UserId, id: ScheduleId) -> DomainResult<ScheduleDeletion> {
        let schedule = self.get(id).await?;
        OwnershipGuard::authorize_resource(&schedule, acting, NOT_YOUR_SCHEDULE)?;
        self.cascade.delete_schedule(schedule.id).await
    }
}
