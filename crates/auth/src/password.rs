//! Password hashing (Argon2id, PHC string format).

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash as Phc, SaltString};
use serde::{Deserialize, Serialize};

use scheduler_core::{DomainError, DomainResult};

/// Stored credential: an Argon2 PHC string, never the raw password.
///
/// `Debug` is redacted so hashes do not end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC string loaded from storage.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash `raw` with a fresh random salt.
    pub fn hash(raw: &str) -> DomainResult<Self> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| DomainError::internal(format!("salt generation failed: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| DomainError::internal(format!("salt encoding failed: {e}")))?;

        let phc = Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(Self(phc))
    }

    /// Whether `raw` hashes to this credential. Malformed stored hashes never match.
    pub fn matches(&self, raw: &str) -> bool {
        match Phc::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
