/// Password hashing using Argon2id
///
/// Hashes are self-describing PHC strings (`$argon2id$v=19$m=...`), so
/// verification reads the parameters from the stored hash and older hashes
/// keep verifying if the parameters below change.
///
/// # Example
///
/// ```
/// use tasker_shared::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("correct horse battery staple").unwrap();
/// assert!(verify_password("correct horse battery staple", &hash).unwrap());
/// assert!(!verify_password("Tr0ub4dor&3", &hash).unwrap());
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, ParamsBuilder, Version,
};

/// Minimum accepted password length at signup and on password change
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    // 19 MiB, 2 passes, 1 lane
    let params = ParamsBuilder::new()
        .m_cost(19 * 1024)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash
///
/// # Returns
///
/// `Ok(false)` for a wrong password; `Err` only when the hash itself is
/// malformed or verification could not run.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks a new password against the length policy
pub fn is_acceptable_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}
