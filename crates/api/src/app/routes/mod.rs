use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Json, Router,
};

use crate::app::errors::ApiError;

pub mod auth;
pub mod comments;
pub mod schedules;
pub mod system;
pub mod users;

/// Full route table. The session gate decides which paths need a login.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .nest("/users", users::router())
        .nest("/schedules", schedules::router())
}

/// Unwrap a JSON body, turning a rejection into a validation failure.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}
