//! Comment routes, nested under `/schedules/:id/comments`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use scheduler_core::{CommentId, ScheduleId};

use crate::app::dto::{CommentRequest, CommentResponse};
use crate::app::errors::ApiError;
use crate::app::routes::body;
use crate::app::services::AppServices;
use crate::context::SessionUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route(
            "/:comment_id",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

fn ids(schedule_id: &str, comment_id: &str) -> Result<(ScheduleId, CommentId), ApiError> {
    Ok((schedule_id.parse()?, comment_id.parse()?))
}

pub async fn create_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path(schedule_id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let schedule_id: ScheduleId = schedule_id.parse()?;
    let content = body(payload)?.validate_create()?;
    let comment = services
        .board
        .comments
        .create(session.user_id(), schedule_id, content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(&comment))).into_response())
}

pub async fn list_comments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(schedule_id): Path<String>,
) -> Result<Response, ApiError> {
    let schedule_id: ScheduleId = schedule_id.parse()?;
    let items = services
        .board
        .comments
        .list(schedule_id)
        .await?
        .iter()
        .map(CommentResponse::from)
        .collect::<Vec<_>>();
    Ok(Json(json!({ "items": items })).into_response())
}

pub async fn get_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Path((schedule_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (schedule_id, comment_id) = ids(&schedule_id, &comment_id)?;
    let comment = services.board.comments.get(schedule_id, comment_id).await?;
    Ok(Json(CommentResponse::from(&comment)).into_response())
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path((schedule_id, comment_id)): Path<(String, String)>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (schedule_id, comment_id) = ids(&schedule_id, &comment_id)?;
    let changes = body(payload)?.validate_update()?;
    let comment = services
        .board
        .comments
        .update(session.user_id(), schedule_id, comment_id, changes)
        .await?;
    Ok(Json(CommentResponse::from(&comment)).into_response())
}

pub async fn delete_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path((schedule_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (schedule_id, comment_id) = ids(&schedule_id, &comment_id)?;
    services
        .board
        .comments
        .delete(session.user_id(), schedule_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
