//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs, input validation, JSON mapping
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use scheduler_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already-wired services.
pub fn router(services: Arc<services::AppServices>) -> Router {
    let gate_state = middleware::GateState {
        gate: services.gate.clone(),
        cookie_name: services.cookie_name.clone(),
    };

    routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(errors::render_errors))
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(
                gate_state,
                middleware::session_gate,
            )),
    )
}
