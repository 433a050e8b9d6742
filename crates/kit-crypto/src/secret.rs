use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::warn;

/// Argon2id memory cost in KiB (19 MiB).
pub const MEMORY_COST_KIB: u32 = 19_456;
/// Argon2id pass count.
pub const TIME_COST: u32 = 2;
/// Argon2id lane count.
pub const PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| anyhow!("Invalid Argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a secret with a fresh random salt. Returns a PHC string, so two
/// calls with the same input never produce the same output.
pub fn hash_secret(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("Hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Check a secret against a stored PHC string. Comparison is done by the
/// Argon2 verifier. A hash that does not parse verifies as false.
pub fn verify_secret(plaintext: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored secret hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("pw1").unwrap();
        assert!(verify_secret("pw1", &hash));
    }

    #[test]
    fn wrong_secret_fails() {
        let hash = hash_secret("pw1").unwrap();
        assert!(!verify_secret("pw2", &hash));
    }

    #[test]
    fn salted_hashes_differ() {
        let a = hash_secret("same secret").unwrap();
        let b = hash_secret("same secret").unwrap();
        assert_ne!(a, b);
        assert!(verify_secret("same secret", &a));
        assert!(verify_secret("same secret", &b));
    }

    #[test]
    fn hash_uses_configured_cost() {
        let hash = hash_secret("pw").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains(&format!("m={},t={},p={}", MEMORY_COST_KIB, TIME_COST, PARALLELISM)));
    }

    #[test]
    fn malformed_hash_is_rejected() {
        assert!(!verify_secret("pw", "not-a-phc-string"));
        assert!(!verify_secret("pw", ""));
    }
}
