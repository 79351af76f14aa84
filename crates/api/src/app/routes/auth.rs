//! Allow-listed routes: signup, login, logout.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::dto::{LoginRequest, SignupRequest, UserResponse};
use crate::app::errors::ApiError;
use crate::app::routes::body;
use crate::app::services::AppServices;
use crate::context::PresentedSession;
use crate::cookie;

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let cmd = body(payload)?.validate()?;
    let user = services.board.users.signup(cmd).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))).into_response())
}

/// Verify credentials and bind a fresh session to the user.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(PresentedSession(presented)): Extension<PresentedSession>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (email, password) = body(payload)?.validate()?;
    let (user, session) = services.board.users.login(&email, &password, presented).await?;

    let mut response = Json(UserResponse::from(&user)).into_response();
    cookie::append(response.headers_mut(), cookie::set_session(&services.cookie_name, session));
    Ok(response)
}

/// Always succeeds; a missing or stale cookie is simply cleared.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(PresentedSession(presented)): Extension<PresentedSession>,
) -> Response {
    services.board.users.logout(presented);

    let mut response = Json(json!({ "message": "logged out" })).into_response();
    cookie::append(response.headers_mut(), cookie::clear_session(&services.cookie_name));
    response
}
