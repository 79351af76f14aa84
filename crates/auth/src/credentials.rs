//! Credential verification: signup, login, password checks.

use std::sync::Arc;

use async_trait::async_trait;

use scheduler_core::{DomainError, DomainResult, UserId};

use crate::password::PasswordHash;
use crate::session::{SessionContext, SessionId};
use crate::user::{normalize_email, NewUser, User};

/// Read side of the user store, as needed by credential checks.
///
/// Emails passed in are already normalized.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn email_exists(&self, email: &str) -> DomainResult<bool>;
}

/// Decides signup/login success and owns every password comparison.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Build an unsaved user for `email`, failing if the email is taken.
    ///
    /// Persisting the returned aggregate is the store's job (which re-checks
    /// uniqueness at insert time).
    pub async fn register(&self, name: &str, email: &str, raw_password: &str) -> DomainResult<NewUser> {
        let email = normalize_email(email);
        if self.store.email_exists(&email).await? {
            return Err(DomainError::DuplicateCredential(email));
        }

        Ok(NewUser {
            id: UserId::new(),
            name: name.trim().to_string(),
            email,
            password_hash: hash_off_thread(raw_password).await?,
        })
    }

    /// Authenticate and bind a fresh session to the user.
    pub async fn login(
        &self,
        email: &str,
        raw_password: &str,
        session: &SessionContext<'_>,
    ) -> DomainResult<(User, SessionId)> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(DomainError::UnknownAccount)?;

        Self::verify(raw_password, &user.password_hash).await?;

        let session_id = session.establish(user.id);
        tracing::info!(user_id = %user.id, "login succeeded; session bound");
        Ok((user, session_id))
    }

    /// Fail with `PasswordIncorrect` unless `raw_password` matches `stored`.
    pub async fn verify(raw_password: &str, stored: &PasswordHash) -> DomainResult<()> {
        if matches_off_thread(raw_password, stored).await? {
            Ok(())
        } else {
            Err(DomainError::PasswordIncorrect)
        }
    }

    /// Hash a replacement password, refusing one equal to the current password.
    pub async fn change_password(new_raw_password: &str, stored: &PasswordHash) -> DomainResult<PasswordHash> {
        if matches_off_thread(new_raw_password, stored).await? {
            return Err(DomainError::PasswordSameAsOld);
        }
        hash_off_thread(new_raw_password).await
    }

    /// Email uniqueness probe for updates (normalizes first).
    pub async fn ensure_email_available(&self, email: &str) -> DomainResult<String> {
        let email = normalize_email(email);
        if self.store.email_exists(&email).await? {
            return Err(DomainError::DuplicateCredential(email));
        }
        Ok(email)
    }
}

// Argon2 is deliberately slow; keep it off the async worker threads.
async fn blocking<T, F>(work: F) -> DomainResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DomainResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::internal(format!("password task failed: {e}")))?
}

async fn hash_off_thread(raw: &str) -> DomainResult<PasswordHash> {
    let raw = raw.to_owned();
    blocking(move || PasswordHash::hash(&raw)).await
}

async fn matches_off_thread(raw: &str, stored: &PasswordHash) -> DomainResult<bool> {
    let raw = raw.to_owned();
    let stored = stored.clone();
    blocking(move || Ok(stored.matches(&raw))).await
}
