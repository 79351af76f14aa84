//! `scheduler-board`: Schedule and Comment aggregates.

pub mod comment;
pub mod paging;
pub mod schedule;

pub use comment::{Comment, CommentChanges, NewComment, MAX_COMMENT_LEN};
pub use paging::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use schedule::{
    NewSchedule, Schedule, ScheduleChanges, ScheduleSummary, MAX_CONTENT_LEN, MAX_TITLE_LEN,
};
