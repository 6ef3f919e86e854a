//! Channel secret hashing
//!
//! Secrets are kept as Argon2 PHC strings; the plaintext never outlives
//! channel creation.

use std::fmt;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{Error, Result};

/// Shared per-channel credential
#[derive(Clone)]
pub struct ChannelSecret {
    hash: Option<String>,
}

impl ChannelSecret {
    /// Hash a plaintext secret. An empty secret means nobody can join
    /// with send capability.
    pub fn new(plain: &str) -> Result<Self> {
        if plain.is_empty() {
            return Ok(Self { hash: None });
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| Error::Secret(e.to_string()))?
            .to_string();

        Ok(Self { hash: Some(hash) })
    }

    pub fn is_set(&self) -> bool {
        self.hash.is_some()
    }

    /// Check a presented secret against the stored hash
    pub fn verify(&self, candidate: &str) -> bool {
        let Some(hash) = &self.hash else {
            return false;
        };
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(e) => {
                tracing::error!(error = %e, "Stored channel secret is not a valid hash");
                return false;
            }
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for ChannelSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSecret")
            .field("set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let secret = ChannelSecret::new("p1").unwrap();
        assert!(secret.is_set());
        assert!(secret.verify("p1"));
        assert!(!secret.verify("wrong"));
        assert!(!secret.verify(""));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let secret = ChannelSecret::new("").unwrap();
        assert!(!secret.is_set());
        assert!(!secret.verify(""));
    }

    #[test]
    fn test_debug_redacts() {
        let secret = ChannelSecret::new("hunter2").unwrap();
        let shown = format!("{:?}", secret);
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("argon2"));
    }
}
