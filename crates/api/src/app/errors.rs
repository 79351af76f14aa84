//! Consistent error responses.
//!
//! Handlers fail with [`ApiError`]. Its response carries an [`ErrorEnvelope`]
//! extension that [`render_errors`] turns into the JSON body once the
//! request path is known:
//!
//! ```json
//! { "status": 404, "error_code": "SCH-404", "message": "...", "path": "/schedules/..", "timestamp": "..." }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;

use scheduler_core::{DomainError, FieldErrors, Resource};

/// A failed request, as seen by the HTTP layer.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::validation("body", rejection.body_text()))
    }
}

/// Status and stable code for every domain failure.
pub fn classify(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "VAL-001"),
        DomainError::LoginRequired => (StatusCode::UNAUTHORIZED, "AUTH-001"),
        DomainError::UnknownAccount => (StatusCode::UNAUTHORIZED, "AUTH-402"),
        DomainError::PasswordIncorrect => (StatusCode::UNAUTHORIZED, "AUTH-401"),
        DomainError::PasswordSameAsOld => (StatusCode::BAD_REQUEST, "AUTH-400"),
        DomainError::ForbiddenNotOwner(_) => (StatusCode::FORBIDDEN, "AUTH-403"),
        DomainError::DuplicateCredential(_) => (StatusCode::BAD_REQUEST, "USER-001"),
        DomainError::NotFound(Resource::User) => (StatusCode::NOT_FOUND, "USER-404"),
        DomainError::NotFound(Resource::Schedule) => (StatusCode::NOT_FOUND, "SCH-404"),
        DomainError::NotFound(Resource::Comment) => (StatusCode::NOT_FOUND, "CMT-404"),
        DomainError::CommentScheduleMismatch => (StatusCode::BAD_REQUEST, "CMT-400"),
        DomainError::InvalidPaging(_) => (StatusCode::BAD_REQUEST, "SCH-400"),
        DomainError::InvariantViolation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SYS-501"),
        DomainError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SYS-500"),
    }
}

/// Everything in the error body except the request path.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub errors: Option<FieldErrors>,
}

impl ErrorEnvelope {
    pub fn from_domain(err: DomainError) -> Self {
        let (status, code) = classify(&err);
        let message = match &err {
            // Server-side details stay in the logs.
            DomainError::Internal(_) | DomainError::InvariantViolation(_) => {
                tracing::error!(error = %err, code, "request failed");
                "internal server error".to_string()
            }
            DomainError::ForbiddenNotOwner(msg) => msg.clone(),
            DomainError::Validation(_) => "validation failed".to_string(),
            other => other.to_string(),
        };
        let errors = match err {
            DomainError::Validation(fields) => Some(fields),
            _ => None,
        };

        Self {
            status,
            code,
            message,
            errors,
        }
    }

    pub fn render(self, path: &str) -> Response {
        let mut body = json!({
            "status": self.status.as_u16(),
            "error_code": self.code,
            "message": self.message,
            "path": path,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(errors) = self.errors {
            body["errors"] = json!(errors);
        }
        (self.status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::from_domain(self.0);
        let mut response = envelope.status.into_response();
        response.extensions_mut().insert(envelope);
        response
    }
}

/// Outermost layer: renders pending [`ErrorEnvelope`]s with the request path.
pub async fn render_errors(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;

    match response.extensions_mut().remove::<ErrorEnvelope>() {
        Some(envelope) => {
            let headers = std::mem::take(response.headers_mut());
            let mut rendered = envelope.render(&path);
            for (name, value) in headers.iter() {
                if name == axum::http::header::SET_COOKIE {
                    rendered.headers_mut().append(name.clone(), value.clone());
                }
            }
            rendered
        }
        None => response,
    }
}
