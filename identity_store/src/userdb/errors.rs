use thiserror::Error;

use crate::password::PasswordError;
use crate::storage::is_unique_violation;

#[derive(Clone, Error, Debug)]
pub enum UserError {
    /// A field is missing or holds a value outside its allowed set
    #[error("Validation error: {0}")]
    Validation(String),

    /// The write would break the email uniqueness invariant
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The database is unreachable, a query failed, or a stored row is corrupt
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Credential error: {0}")]
    Credential(String),
}

impl UserError {
    /// Map a failed insert/update, turning a UNIQUE violation into `Conflict`
    pub(crate) fn from_write(err: sqlx::Error, email: &str) -> Self {
        if is_unique_violation(&err) {
            tracing::warn!("Rejected write for an email that is already registered");
            UserError::Conflict(format!("email '{email}' is already registered"))
        } else {
            UserError::Storage(err.to_string())
        }
    }
}

impl From<PasswordError> for UserError {
    fn from(err: PasswordError) -> Self {
        UserError::Credential(err.to_string())
    }
}

impl From<serde_json::Error> for UserError {
    fn from(err: serde_json::Error) -> Self {
        UserError::Validation(err.to_string())
    }
}
