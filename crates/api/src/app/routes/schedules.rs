use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use scheduler_board::PageRequest;
use scheduler_core::{DomainError, ScheduleId, UserId};

use crate::app::dto::{
    CreateScheduleRequest, ListSchedulesQuery, PageResponse, ScheduleResponse, ScheduleSummaryResponse,
    UpdateScheduleRequest,
};
use crate::app::errors::ApiError;
use crate::app::routes::{body, comments};
use crate::app::services::AppServices;
use crate::context::SessionUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_schedules).post(create_schedule))
        .route(
            "/:id",
            get(get_schedule).patch(update_schedule).delete(delete_schedule),
        )
        .nest("/:id/comments", comments::router())
}

pub async fn create_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (title, content) = body(payload)?.validate()?;
    let schedule = services
        .board
        .schedules
        .create(session.user_id(), title, content)
        .await?;
    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(&schedule))).into_response())
}

pub async fn list_schedules(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ListSchedulesQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| DomainError::InvalidPaging(e.body_text()))?;
    let request = page_request(query)?;

    let page = services.board.schedules.list(request).await?;
    let page = PageResponse::from(page.map(ScheduleSummaryResponse::from));
    Ok(Json(page).into_response())
}

pub async fn get_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ScheduleId = id.parse()?;
    let schedule = services.board.schedules.get(id).await?;
    Ok(Json(ScheduleResponse::from(&schedule)).into_response())
}

pub async fn update_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateScheduleRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id: ScheduleId = id.parse()?;
    let changes = body(payload)?.validate()?;
    let schedule = services
        .board
        .schedules
        .update(session.user_id(), id, changes)
        .await?;
    Ok(Json(ScheduleResponse::from(&schedule)).into_response())
}

pub async fn delete_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ScheduleId = id.parse()?;
    let removed = services.board.schedules.delete(session.user_id(), id).await?;
    tracing::info!(schedule_id = %id, comments = removed.comments, "schedule deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Numbers that fail to parse are paging errors, not id errors.
fn page_request(query: ListSchedulesQuery) -> Result<PageRequest, DomainError> {
    let number = |field: &str, raw: Option<String>| {
        raw.map(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| DomainError::InvalidPaging(format!("{field} must be a non-negative integer")))
        })
        .transpose()
    };

    let page = number("page", query.page)?;
    let size = number("size", query.size)?;
    let user_id = query
        .user_id
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse::<UserId>()
                .map_err(|_| DomainError::InvalidPaging("user_id must be a user id".to_string()))
        })
        .transpose()?;

    PageRequest::new(page, size, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, size: Option<&str>, user_id: Option<&str>) -> ListSchedulesQuery {
        ListSchedulesQuery {
            page: page.map(str::to_string),
            size: size.map(str::to_string),
            user_id: user_id.map(str::to_string),
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        let request = page_request(query(None, None, None)).unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.size, scheduler_board::DEFAULT_PAGE_SIZE);
        assert_eq!(request.user_id, None);
    }

    #[test]
    fn malformed_numbers_are_paging_errors() {
        for q in [
            query(Some("-1"), None, None),
            query(None, Some("ten"), None),
            query(None, Some("0"), None),
            query(None, Some("101"), None),
            query(None, None, Some("nobody")),
        ] {
            assert!(matches!(page_request(q), Err(DomainError::InvalidPaging(_))));
        }
    }

    #[test]
    fn user_filter_is_parsed() {
        let id = UserId::new();
        let request = page_request(query(Some("2"), Some("5"), Some(&id.to_string()))).unwrap();
        assert_eq!((request.page, request.size), (2, 5));
        assert_eq!(request.user_id, Some(id));
    }
}
