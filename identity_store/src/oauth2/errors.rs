use thiserror::Error;

use crate::storage::is_unique_violation;

#[derive(Debug, Error, Clone)]
pub enum OAuthAccountError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// The `(provider, provider_account_id)` pair is already linked
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OAuthAccountError {
    pub(crate) fn from_write(err: sqlx::Error, provider: &str) -> Self {
        if is_unique_violation(&err) {
            tracing::warn!(provider, "Rejected duplicate provider account link");
            OAuthAccountError::Conflict(format!(
                "{provider} account is already linked"
            ))
        } else {
            OAuthAccountError::Storage(err.to_string())
        }
    }
}
