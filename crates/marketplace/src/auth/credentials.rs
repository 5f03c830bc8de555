//! Password credentials, hashed with bcrypt.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use workflow::WorkflowError;

use crate::error::ValidationError;

/// Shortest password accepted for a new or reset credential.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest password bcrypt can hash without truncating, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Lowest bcrypt cost the hasher will use.
pub const MIN_COST: u32 = 4;

const MAX_COST: u32 = 31;

/// Algorithm tag of credentials produced by [`CredentialHasher`].
pub const BCRYPT: &str = "bcrypt";

/// Checks a password against the password policy.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::PasswordTooLong {
            max: MAX_PASSWORD_BYTES,
        });
    }
    Ok(())
}

/// Hashing a password failed.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password could not be hashed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<CredentialError> for WorkflowError {
    fn from(err: CredentialError) -> Self {
        WorkflowError::Validation(err.to_string())
    }
}

/// A stored password hash.
///
/// `hash` is a modular crypt string (`$2b$<cost>$<salt><digest>`), so the
/// cost and salt travel with it and credentials hashed under an older cost
/// keep verifying.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub algorithm: String,
    pub hash: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Hashes and verifies passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CredentialHasher {
    /// Creates a hasher with the given bcrypt cost, clamped to the range
    /// bcrypt accepts.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes `password` under a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<Credential, CredentialError> {
        Ok(Credential {
            algorithm: BCRYPT.to_string(),
            hash: bcrypt::hash(password, self.cost)?,
        })
    }

    /// Hashes `password` on the blocking thread pool, keeping bcrypt's work
    /// off the async workers.
    pub async fn spawn_hash(&self, password: &str) -> Result<Credential, CredentialError> {
        let hasher = *self;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// Returns true if `password` matches the stored credential.
    pub fn verify(&self, credential: &Credential, password: &str) -> bool {
        if credential.algorithm != BCRYPT {
            return false;
        }
        match bcrypt::verify(password, &credential.hash) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(error = %err, "stored credential could not be read");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_cost(MIN_COST)
    }

    #[test]
    fn hash_then_verify() {
        let credential = hasher().hash("correct horse").unwrap();

        assert_eq!(credential.algorithm, BCRYPT);
        assert!(credential.hash.starts_with("$2"));
        assert!(hasher().verify(&credential, "correct horse"));
        assert!(!hasher().verify(&credential, "wrong horse"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hasher().hash("same password").unwrap();
        let b = hasher().hash("same password").unwrap();

        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn verification_uses_the_stored_cost() {
        let old = CredentialHasher::with_cost(5).hash("harvest-2025").unwrap();
        assert!(hasher().verify(&old, "harvest-2025"));
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(CredentialHasher::with_cost(1).cost(), MIN_COST);
        assert_eq!(CredentialHasher::with_cost(99).cost(), MAX_COST);
        assert_eq!(CredentialHasher::default().cost(), bcrypt::DEFAULT_COST);
    }

    #[test]
    fn unknown_or_corrupt_credentials_never_verify() {
        let mut credential = hasher().hash("secret-pass").unwrap();
        credential.algorithm = "sha256".to_string();
        assert!(!hasher().verify(&credential, "secret-pass"));

        let corrupt = Credential {
            algorithm: BCRYPT.to_string(),
            hash: "not a bcrypt hash".to_string(),
        };
        assert!(!hasher().verify(&corrupt, "secret-pass"));
    }

    #[tokio::test]
    async fn hashing_on_the_blocking_pool() {
        let credential = hasher().spawn_hash("correct horse").await.unwrap();
        assert!(hasher().verify(&credential, "correct horse"));
    }

    #[test]
    fn debug_output_hides_the_hash() {
        let credential = hasher().hash("secret-pass").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains(&credential.hash));
    }

    #[test]
    fn password_policy_bounds_the_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert_eq!(
            validate_password(&"x".repeat(MAX_PASSWORD_BYTES + 1)),
            Err(ValidationError::PasswordTooLong {
                max: MAX_PASSWORD_BYTES
            })
        );
    }
}
