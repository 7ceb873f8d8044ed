use async_trait::async_trait;
use auth::PasswordError;
use auth::PasswordHasher;

use crate::domain::session::errors::PasswordVerifierError;
use crate::domain::session::ports::PasswordVerifier;

/// Argon2id hashing for passwords and refresh secrets.
///
/// Hashing is CPU-bound, so every call runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct Argon2PasswordVerifier {
    hasher: PasswordHasher,
}

impl Argon2PasswordVerifier {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self { hasher }
    }
}

impl Default for Argon2PasswordVerifier {
    fn default() -> Self {
        Self::new(PasswordHasher::new())
    }
}

#[async_trait]
impl PasswordVerifier for Argon2PasswordVerifier {
    async fn hash(&self, secret: &str) -> Result<String, PasswordVerifierError> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| PasswordVerifierError::HashingFailed(e.to_string()))?
            .map_err(|e| PasswordVerifierError::HashingFailed(e.to_string()))
    }

    async fn compare(&self, secret: &str, digest: &str) -> Result<bool, PasswordVerifierError> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();
        let digest = digest.to_string();

        let result = tokio::task::spawn_blocking(move || hasher.verify(&secret, &digest))
            .await
            .map_err(|e| PasswordVerifierError::HashingFailed(e.to_string()))?;

        match result {
            Ok(matched) => Ok(matched),
            Err(PasswordError::VerificationFailed(reason)) => {
                tracing::warn!(reason = %reason, "Stored digest is malformed");
                Ok(false)
            }
            Err(e) => Err(PasswordVerifierError::HashingFailed(e.to_string())),
        }
    }
}
