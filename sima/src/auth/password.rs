//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::config::Argon2Config;
use crate::errors::Error;

/// Characters used for generated temporary passwords. Visually ambiguous
/// glyphs (I/l/1, O/o/0) are excluded so the password survives being read
/// over a phone or copied from paper.
const TEMP_PASSWORD_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

fn to_argon2(config: Argon2Config) -> Result<Argon2<'static>, Error> {
    let params =
        Params::new(config.memory_kib, config.iterations, config.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password using Argon2id with the given cost parameters.
pub fn hash_password(password: &str, config: Argon2Config) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = to_argon2(config)?;

    let hash = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Verification uses the parameters embedded in the hash itself, so cost
/// changes only affect new hashes. Returns `false` (never an error) for
/// mismatched or malformed input.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash failed to parse");
        return false;
    };

    Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok()
}

/// Generate a temporary password for a newly created user.
pub fn generate_temp_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..TEMP_PASSWORD_CHARSET.len());
            TEMP_PASSWORD_CHARSET[idx] as char
        })
        .collect()
}
