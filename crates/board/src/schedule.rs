use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scheduler_core::{overwrite, AggregateRoot, Owned, ScheduleId, Timestamps, UserId};

/// Upper bound on schedule title length (characters).
pub const MAX_TITLE_LEN: usize = 30;

/// Upper bound on schedule content length (characters).
pub const MAX_CONTENT_LEN: usize = 200;

/// Aggregate root: Schedule.
///
/// # Invariants
/// - `owner_id` references an existing user and never changes after creation.
/// - Comments referencing this schedule are removed before the schedule is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
    pub timestamps: Timestamps,
}

/// An unsaved schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchedule {
    pub id: ScheduleId,
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
}

impl NewSchedule {
    pub fn new(owner_id: UserId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ScheduleId::new(),
            owner_id,
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Partial update; the owner is deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl ScheduleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

impl Schedule {
    /// Produce the next version of this schedule with `changes` applied.
    pub fn apply(mut self, changes: ScheduleChanges) -> Self {
        overwrite(&mut self.title, changes.title);
        overwrite(&mut self.content, changes.content);
        self
    }
}

impl AggregateRoot for Schedule {
    type Id = ScheduleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Owned for Schedule {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.owner_id)
    }
}

/// Listing row: a schedule with its comment count and owner name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub id: ScheduleId,
    pub owner_id: UserId,
    pub user_name: String,
    pub title: String,
    pub content: String,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stored(title: &str, content: &str) -> Schedule {
        let new = NewSchedule::new(UserId::new(), title, content);
        Schedule {
            id: new.id,
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            timestamps: Timestamps::at(Utc::now()),
        }
    }

    #[test]
    fn title_only_patch_keeps_content() {
        let schedule = stored("T", "C");
        let next = schedule.clone().apply(ScheduleChanges {
            title: Some("X".to_string()),
            content: None,
        });

        assert_eq!(next.title, "X");
        assert_eq!(next.content, "C");
        assert_eq!(next.owner_id, schedule.owner_id);
        assert_eq!(next.id, schedule.id);
    }

    #[test]
    fn empty_patch_is_identity() {
        let schedule = stored("T", "C");
        assert!(ScheduleChanges::default().is_empty());
        assert_eq!(schedule.clone().apply(ScheduleChanges::default()), schedule);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: each field ends up as the patch value if present, else unchanged.
        #[test]
        fn apply_is_fieldwise_overwrite(
            title in proptest::option::of("[A-Za-z ]{1,30}"),
            content in proptest::option::of("[A-Za-z ]{1,200}")
        ) {
            let schedule = stored("orig-title", "orig-content");
            let next = schedule.clone().apply(ScheduleChanges {
                title: title.clone(),
                content: content.clone(),
            });

            prop_assert_eq!(next.title, title.unwrap_or(schedule.title));
            prop_assert_eq!(next.content, content.unwrap_or(schedule.content));
            prop_assert_eq!(next.owner_id, schedule.owner_id);
        }
    }
}
