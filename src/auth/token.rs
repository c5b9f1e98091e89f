use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "ds";
const SECRET_BYTES: usize = 24;

/// Generates user credentials and checks them against stored argon2id hashes.
#[derive(Clone)]
pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Generates a new token with the format: ds_<secret>
    /// Returns (raw_token, hash)
    pub fn generate(&self) -> Result<(String, String)> {
        let mut secret = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut secret);
        let raw_token = format!("{TOKEN_PREFIX}_{}", URL_SAFE_NO_PAD.encode(secret));
        let hash = self.hash(&raw_token)?;
        Ok((raw_token, hash))
    }

    /// Hashes a raw token using Argon2id
    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a raw token against a stored hash. A malformed stored hash
    /// never verifies.
    #[must_use]
    pub fn verify(&self, token: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::warn!("stored credential hash is malformed");
            return false;
        };
        self.argon2
            .verify_password(token.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format() {
        let generator = TokenGenerator::new();
        let (token, _hash) = generator.generate().unwrap();

        let secret = token.strip_prefix("ds_").unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(secret).unwrap().len(), SECRET_BYTES);
    }

    #[test]
    fn test_tokens_are_unique() {
        let generator = TokenGenerator::new();
        let (first, _) = generator.generate().unwrap();
        let (second, _) = generator.generate().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verification() {
        let generator = TokenGenerator::new();
        let (token, hash) = generator.generate().unwrap();

        assert!(generator.verify(&token, &hash));
        assert!(!generator.verify("ds_wrong", &hash));
        assert!(!generator.verify(&token, "not-a-hash"));
    }

    #[test]
    fn test_hash_is_phc_format() {
        let generator = TokenGenerator::new();
        let (_, hash) = generator.generate().unwrap();

        assert!(hash.starts_with("$argon2id$"));
    }
}
