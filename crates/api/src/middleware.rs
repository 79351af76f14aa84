use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use scheduler_auth::{GateDecision, SessionAuthGate};
use scheduler_core::DomainError;

use crate::app::errors::ApiError;
use crate::context::{PresentedSession, SessionUser};
use crate::cookie;

#[derive(Clone)]
pub struct GateState {
    pub gate: SessionAuthGate,
    pub cookie_name: Arc<str>,
}

/// Runs every request through the session gate.
///
/// Allow-listed paths pass untouched; protected paths need a bound session
/// and get a [`SessionUser`] attached. Everything else is answered with 401
/// before any handler runs, clearing whatever session cookie was sent.
pub async fn session_gate(State(state): State<GateState>, mut req: Request, next: Next) -> Response {
    let sent_cookie = cookie::cookie_value(req.headers(), &state.cookie_name).is_some();
    let presented = cookie::session_from_headers(req.headers(), &state.cookie_name);
    let decision = state.gate.admit(req.uri().path(), presented);

    req.extensions_mut().insert(PresentedSession(presented));
    match decision {
        GateDecision::Public => next.run(req).await,
        GateDecision::Authenticated(user_id) => {
            req.extensions_mut().insert(SessionUser::new(user_id));
            next.run(req).await
        }
        GateDecision::Rejected(_) => {
            let mut response = ApiError(DomainError::LoginRequired).into_response();
            if sent_cookie {
                cookie::append(response.headers_mut(), cookie::clear_session(&state.cookie_name));
            }
            response
        }
    }
}
