//! Application services: one per aggregate.
//!
//! Services take already-validated input from the HTTP boundary, apply the
//! ownership guard before every mutation or deletion, and persist through the
//! injected [`BoardStore`].

use std::sync::Arc;

use scheduler_auth::{CredentialStore, CredentialVerifier, SessionStore};

use crate::cascade::CascadingDeletionCoordinator;
use crate::store::BoardStore;

pub mod comments;
pub mod schedules;
pub mod users;

pub use comments::CommentService;
pub use schedules::ScheduleService;
pub use users::{SignupCommand, UpdateUserCommand, UserService};

/// Every service wired over one store and one session store.
#[derive(Clone)]
pub struct BoardServices {
    pub users: UserService,
    pub schedules: ScheduleService,
    pub comments: CommentService,
}

impl BoardServices {
    pub fn new<S>(store: Arc<S>, sessions: Arc<dyn SessionStore>) -> Self
    where
        S: BoardStore + 'static,
    {
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let store: Arc<dyn BoardStore> = store;
        let cascade = CascadingDeletionCoordinator::new(store.clone(), sessions.clone());

        Self {
            users: UserService::new(
                store.clone(),
                sessions,
                CredentialVerifier::new(credentials),
                cascade.clone(),
            ),
            schedules: ScheduleService::new(store.clone(), cascade),
            comments: CommentService::new(store),
        }
    }
}
