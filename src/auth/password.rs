//! Argon2id password hashing.
//!
//! Hashing is CPU-bound; services call these through
//! [`tokio::task::spawn_blocking`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::ApiError;

/// Hashes `password` with a fresh random salt into a PHC string.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("password hashing failed: {err}")))
}

/// Checks `password` against a stored PHC string.
///
/// A malformed stored hash verifies as `false`.
#[must_use]
pub fn verify_password(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
}

/// Runs [`hash_password`] on the blocking pool.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if hashing fails or the task panics.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| ApiError::Internal(format!("hashing task failed: {err}")))?
}

/// Runs [`verify_password`] on the blocking pool.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the task panics.
pub async fn verify_password_blocking(password: String, phc: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &phc))
        .await
        .map_err(|err| ApiError::Internal(format!("verification task failed: {err}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifies() {
        let Ok(first) = hash_password("correct horse") else {
            panic!("hashing failed");
        };
        let Ok(second) = hash_password("correct horse") else {
            panic!("hashing failed");
        };
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &first));
        assert!(!verify_password("wrong", &first));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn blocking_wrappers_agree() {
        let Ok(hash) = hash_password_blocking("s3cret!".to_string()).await else {
            panic!("hashing failed");
        };
        let verified = verify_password_blocking("s3cret!".to_string(), hash).await;
        assert!(matches!(verified, Ok(true)));
    }
}
