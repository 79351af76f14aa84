use std::sync::Arc;

use tracing::instrument;

use scheduler_auth::{
    normalize_email, CredentialVerifier, OwnershipGuard, SessionContext, SessionId, SessionStore, User,
    UserChanges,
};
use scheduler_core::{DomainError, DomainResult, Resource, UserId};

use crate::cascade::{CascadingDeletionCoordinator, UserDeletion};
use crate::store::BoardStore;

const NOT_YOUR_ACCOUNT: &str = "you can only modify your own account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupCommand {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Self-service update; `current_password` is always required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserCommand {
    pub current_password: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn BoardStore>,
    sessions: Arc<dyn SessionStore>,
    verifier: CredentialVerifier,
    cascade: CascadingDeletionCoordinator,
}

impl UserService {
    pub fn new(
        store: Arc<dyn BoardStore>,
        sessions: Arc<dyn SessionStore>,
        verifier: CredentialVerifier,
        cascade: CascadingDeletionCoordinator,
    ) -> Self {
        Self {
            store,
            sessions,
            verifier,
            cascade,
        }
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn signup(&self, cmd: SignupCommand) -> DomainResult<User> {
        let new = self.verifier.register(&cmd.name, &cmd.email, &cmd.password).await?;
        let user = self.store.insert_user(new).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Authenticate and return the freshly bound session id.
    #[instrument(skip_all, err)]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        current: Option<SessionId>,
    ) -> DomainResult<(User, SessionId)> {
        let ctx = SessionContext::new(self.sessions.as_ref(), current);
        self.verifier.login(email, password, &ctx).await
    }

    pub fn logout(&self, current: Option<SessionId>) {
        SessionContext::new(self.sessions.as_ref(), current).end();
        tracing::info!("session ended");
    }

    pub async fn list(&self) -> DomainResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get(&self, id: UserId) -> DomainResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or(DomainError::not_found(Resource::User))
    }

    /// Apply a self-service update. A request that changes nothing returns the
    /// user as stored, without advancing `modified_at`.
    #[instrument(skip(self, cmd), fields(acting = %acting, target = %id), err)]
    pub async fn update(&self, acting: UserId, id: UserId, cmd: UpdateUserCommand) -> DomainResult<User> {
        let user = self.get(id).await?;
        OwnershipGuard::authorize_resource(&user, acting, NOT_YOUR_ACCOUNT)?;
        CredentialVerifier::verify(&cmd.current_password, &user.password_hash).await?;

        let email = match cmd.email {
            Some(email) if normalize_email(&email) != user.email => {
                Some(self.verifier.ensure_email_available(&email).await?)
            }
            _ => None,
        };
        let password_hash = match cmd.new_password {
            Some(raw) => Some(CredentialVerifier::change_password(&raw, &user.password_hash).await?),
            None => None,
        };

        let changes = UserChanges {
            name: cmd.name,
            email,
            password_hash,
        };
        if changes.is_empty() {
            return Ok(user);
        }

        let updated = self.store.update_user(user.apply(changes)).await?;
        tracing::info!("user updated");
        Ok(updated)
    }

    /// Delete the caller's own account after re-checking the password.
    #[instrument(skip(self, password), fields(acting = %acting, target = %id), err)]
    pub async fn delete(&self, acting: UserId, id: UserId, password: &str) -> DomainResult<UserDeletion> {
        let user = self.get(id).await?;
        OwnershipGuard::authorize_resource(&user, acting, NOT_YOUR_ACCOUNT)?;
        CredentialVerifier::verify(password, &user.password_hash).await?;
        self.cascade.delete_user(user.id).await
    }
}
