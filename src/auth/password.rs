//! Password hashing with bcrypt

use crate::error::{Error, Result};

/// bcrypt only reads this many bytes of input
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Salted one-way hashing of user passwords
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password for storage
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] are rejected rather than
    /// silently truncated.
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(Error::validation("Password too long (max 72 characters)"));
        }

        bcrypt::hash(password, self.cost).map_err(|e| Error::Internal(format!("bcrypt: {e}")))
    }

    /// Check a password against a stored hash
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }

        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash could not be read");
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_blocking(&self, password: String) -> Result<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// [`verify`](Self::verify) on the blocking thread pool
    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool> {
        let hasher = *self;
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST)
    }

    #[test]
    fn hash_then_verify() {
        let hash = hasher().hash("longenough1").unwrap();

        assert_ne!(hash, "longenough1");
        assert!(hasher().verify("longenough1", &hash));
        assert!(!hasher().verify("longenough2", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hasher().hash("longenough1").unwrap();
        let second = hasher().hash("longenough1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn limit_is_counted_in_bytes() {
        assert!(hasher().hash(&"a".repeat(72)).is_ok());

        // 40 characters but 80 bytes
        let err = hasher().hash(&"é".repeat(40)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn overlong_password_never_verifies() {
        let hash = hasher().hash(&"a".repeat(72)).unwrap();
        assert!(!hasher().verify(&"a".repeat(73), &hash));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!hasher().verify("longenough1", "not-a-bcrypt-hash"));
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let hash = hasher().hash_blocking("longenough1".to_string()).await.unwrap();
        let ok = hasher()
            .verify_blocking("longenough1".to_string(), hash)
            .await
            .unwrap();
        assert!(ok);
    }
}
