//! Infrastructure wiring: pick a store, build the services over it.

use std::sync::Arc;
use std::time::Duration;

use scheduler_auth::{InMemorySessionStore, SessionAuthGate, SessionStore, DEFAULT_IDLE_TIMEOUT};
use scheduler_infra::{AppConfig, BoardServices, InMemoryBoardStore, PostgresBoardStore};

/// Everything handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub board: BoardServices,
    pub gate: SessionAuthGate,
    pub cookie_name: Arc<str>,
}

impl AppServices {
    /// In-memory wiring (tests and local development).
    pub fn in_memory(cookie_name: &str) -> Self {
        Self::in_memory_with_idle_timeout(cookie_name, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn in_memory_with_idle_timeout(cookie_name: &str, idle_timeout: Duration) -> Self {
        Self::over(Arc::new(InMemoryBoardStore::new()), cookie_name, idle_timeout)
    }

    fn over<S>(store: Arc<S>, cookie_name: &str, idle_timeout: Duration) -> Self
    where
        S: scheduler_infra::BoardStore + 'static,
    {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_idle_timeout(idle_timeout));
        Self {
            board: BoardServices::new(store, sessions.clone()),
            gate: SessionAuthGate::new(sessions),
            cookie_name: Arc::from(cookie_name),
        }
    }
}

/// Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresBoardStore::connect(url, config.database_max_connections).await?;
            tracing::info!("using postgres board store");
            Ok(AppServices::over(
                Arc::new(store),
                &config.session_cookie_name,
                config.session_idle_timeout,
            ))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory board store");
            Ok(AppServices::in_memory_with_idle_timeout(
                &config.session_cookie_name,
                config.session_idle_timeout,
            ))
        }
    }
}
