use serde::{Deserialize, Serialize};

use scheduler_auth::{User, MAX_NAME_LEN};
use scheduler_board::{
    Comment, CommentChanges, Page, ScheduleChanges, Schedule, ScheduleSummary, MAX_COMMENT_LEN,
    MAX_CONTENT_LEN, MAX_TITLE_LEN,
};
use scheduler_core::{DomainResult, FieldValidator};
use scheduler_infra::services::{SignupCommand, UpdateUserCommand};

// -------------------------
// Request DTOs
// -------------------------
//
// Missing fields deserialize as `None` so that validation, not serde,
// reports them (with a per-field message). Unknown fields are ignored.

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl SignupRequest {
    pub fn validate(self) -> DomainResult<SignupCommand> {
        // Names are stored trimmed, so the length limit applies to the trimmed value.
        let name = self.name.unwrap_or_default().trim().to_string();
        let email = self.email.unwrap_or_default();
        let password = self.password.unwrap_or_default();

        FieldValidator::new()
            .required_text("name", &name, MAX_NAME_LEN)
            .email("email", &email)
            .secret("password", &password)
            .finish()?;

        Ok(SignupCommand {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(email, password)`.
    pub fn validate(self) -> DomainResult<(String, String)> {
        let email = self.email.unwrap_or_default();
        let password = self.password.unwrap_or_default();

        FieldValidator::new()
            .email("email", &email)
            .secret("password", &password)
            .finish()?;
        Ok((email, password))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> DomainResult<UpdateUserCommand> {
        let current_password = self.password.unwrap_or_default();
        let name = self.name.map(|n| n.trim().to_string());

        FieldValidator::new()
            .secret("password", &current_password)
            .optional_text("name", name.as_deref(), MAX_NAME_LEN)
            .optional_email("email", self.email.as_deref())
            .optional_secret("new_password", self.new_password.as_deref())
            .finish()?;

        Ok(UpdateUserCommand {
            current_password,
            name,
            email: self.email,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteUserRequest {
    pub password: Option<String>,
}

impl DeleteUserRequest {
    pub fn validate(self) -> DomainResult<String> {
        let password = self.password.unwrap_or_default();
        FieldValidator::new().secret("password", &password).finish()?;
        Ok(password)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateScheduleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl CreateScheduleRequest {
    /// Returns `(title, content)`.
    pub fn validate(self) -> DomainResult<(String, String)> {
        let title = self.title.unwrap_or_default();
        let content = self.content.unwrap_or_default();

        FieldValidator::new()
            .required_text("title", &title, MAX_TITLE_LEN)
            .required_text("content", &content, MAX_CONTENT_LEN)
            .finish()?;
        Ok((title, content))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdateScheduleRequest {
    pub fn validate(self) -> DomainResult<ScheduleChanges> {
        FieldValidator::new()
            .optional_text("title", self.title.as_deref(), MAX_TITLE_LEN)
            .optional_text("content", self.content.as_deref(), MAX_CONTENT_LEN)
            .finish()?;
        Ok(ScheduleChanges {
            title: self.title,
            content: self.content,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

impl CommentRequest {
    pub fn validate_create(self) -> DomainResult<String> {
        let content = self.content.unwrap_or_default();
        FieldValidator::new()
            .required_text("content", &content, MAX_COMMENT_LEN)
            .finish()?;
        Ok(content)
    }

    pub fn validate_update(self) -> DomainResult<CommentChanges> {
        FieldValidator::new()
            .optional_text("content", self.content.as_deref(), MAX_COMMENT_LEN)
            .finish()?;
        Ok(CommentChanges {
            content: self.content,
        })
    }
}

/// `GET /schedules` query string; numbers are parsed by the handler so a
/// bad value maps to a paging error rather than a generic rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListSchedulesQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub user_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of a user; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub modified_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.timestamps.created_at.to_rfc3339(),
            modified_at: user.timestamps.modified_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub modified_at: String,
}

impl From<&Schedule> for ScheduleResponse {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id.to_string(),
            user_id: schedule.owner_id.to_string(),
            title: schedule.title.clone(),
            content: schedule.content.clone(),
            created_at: schedule.timestamps.created_at.to_rfc3339(),
            modified_at: schedule.timestamps.modified_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleSummaryResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub content: String,
    pub comment_count: u64,
    pub created_at: String,
    pub modified_at: String,
}

impl From<ScheduleSummary> for ScheduleSummaryResponse {
    fn from(summary: ScheduleSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            user_id: summary.owner_id.to_string(),
            user_name: summary.user_name,
            title: summary.title,
            content: summary.content,
            comment_count: summary.comment_count,
            created_at: summary.created_at.to_rfc3339(),
            modified_at: summary.modified_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items,
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub schedule_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub modified_at: String,
}

impl From<&Comment> for CommentResponse {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.to_string(),
            schedule_id: comment.schedule_id.to_string(),
            user_id: comment.owner_id.to_string(),
            content: comment.content.clone(),
            created_at: comment.timestamps.created_at.to_rfc3339(),
            modified_at: comment.timestamps.modified_at.to_rfc3339(),
        }
    }
}
