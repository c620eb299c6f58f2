//! Password hashing with bcrypt.
//!
//! bcrypt is CPU-bound, so every call runs on the blocking thread pool
//! instead of stalling the async runtime.

use anyhow::Context;
use tokio::sync::OnceCell;
use tokio::task;

use crate::error::AppError;

/// One-way password hasher with a fixed work factor.
pub struct PasswordHasher {
    cost: u32,
    /// Digest checked when the account does not exist, so a login for an
    /// unknown email takes as long as a wrong password.
    decoy: OnceCell<String>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: OnceCell::new(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.cost;

        let hash = task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("Password hashing task panicked")?
            .context("Password hashing failed")?;

        Ok(hash)
    }

    /// Check a plaintext password against a stored digest.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_string();
        let hash = hash.to_string();

        let is_valid = task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("Password verification task panicked")?
            .context("Stored password hash is malformed")?;

        Ok(is_valid)
    }

    /// Spend the same effort as [`verify`](Self::verify) without a real account.
    pub async fn verify_decoy(&self, password: &str) -> Result<(), AppError> {
        let decoy = self
            .decoy
            .get_or_try_init(|| self.hash("fittrack-decoy-password"))
            .await?;
        self.verify(password, decoy).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let password = "correct horse battery staple";
        let hash = hasher.hash(password).await.unwrap();

        assert_ne!(hash, password);
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify(password, &hash).await.unwrap());
        assert!(!hasher.verify("wrong password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let hasher = PasswordHasher::new(4);
        let a = hasher.hash("password123").await.unwrap();
        let b = hasher.hash("password123").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_cost_is_encoded_in_digest() {
        let hasher = PasswordHasher::new(5);
        let hash = hasher.hash("password123").await.unwrap();
        assert!(hash.contains("$05$"));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        assert!(hasher.verify("password123", "not-a-hash").await.is_err());
    }

    #[tokio::test]
    async fn test_decoy_verification() {
        let hasher = PasswordHasher::new(4);
        hasher.verify_decoy("anything").await.unwrap();
        hasher.verify_decoy("anything else").await.unwrap();
    }
}
