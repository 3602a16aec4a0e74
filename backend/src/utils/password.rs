//! Slow one-way hashing for console tokens and session secrets.
//!
//! The cost factor follows the bcrypt convention of a base-2 exponent: a cost
//! of `n` allocates `2^n` KiB of Argon2id memory per hash.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct SecretHasher {
    cost: u32,
}

impl SecretHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(8, 20),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    fn argon2(&self) -> anyhow::Result<Argon2<'static>> {
        let params = Params::new(1 << self.cost, TIME_COST, PARALLELISM, None)
            .map_err(|e| anyhow::anyhow!("Invalid hash parameters: {}", e))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, secret: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash secret: {}", e))?;
        Ok(hash.to_string())
    }

    /// Returns `false` for both mismatches and malformed stored hashes.
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(error = %err, "Skipping malformed stored hash");
                return false;
            }
        };
        // Parameters embedded in the stored hash take precedence.
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
