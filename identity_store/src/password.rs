//! One-way password hashing with bcrypt

use thiserror::Error;

/// Work factor for every stored password hash
pub const BCRYPT_COST: u32 = 12;

#[derive(Debug, Error, Clone)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Failed to verify password: {0}")]
    Verify(String),
}

/// Hash `password` with a fresh salt at [`BCRYPT_COST`].
///
/// bcrypt is CPU bound, so the work runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `password` against a hash produced by [`hash_password`]
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| PasswordError::Verify(e.to_string()))?
        .map_err(|e| PasswordError::Verify(e.to_string()))
}
