use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use scheduler_core::UserId;

use crate::app::dto::{DeleteUserRequest, UpdateUserRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::routes::body;
use crate::app::services::AppServices;
use crate::context::SessionUser;
use crate::cookie;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, ApiError> {
    let items = services
        .board
        .users
        .list()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect::<Vec<_>>();
    Ok(Json(json!({ "items": items })).into_response())
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = id.parse()?;
    let user = services.board.users.get(id).await?;
    Ok(Json(UserResponse::from(&user)).into_response())
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id: UserId = id.parse()?;
    let cmd = body(payload)?.validate()?;
    let user = services.board.users.update(session.user_id(), id, cmd).await?;
    Ok(Json(UserResponse::from(&user)).into_response())
}

/// Delete the caller's own account; the session cookie goes with it.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id: UserId = id.parse()?;
    let password = body(payload)?.validate()?;
    let removed = services.board.users.delete(session.user_id(), id, &password).await?;
    tracing::info!(
        user_id = %id,
        schedules = removed.schedules,
        comments = removed.comments,
        sessions = removed.sessions,
        "account deleted"
    );

    let mut response = StatusCode::NO_CONTENT.into_response();
    cookie::append(response.headers_mut(), cookie::clear_session(&services.cookie_name));
    Ok(response)
}
