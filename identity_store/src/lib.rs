//! identity_store - user identity and linked OAuth account persistence
//!
//! Owns the canonical shape of a [`User`] and an [`OAuthAccount`], enforces
//! their uniqueness and presence rules at the storage boundary, and hashes
//! credentials before they are written. Works over SQLite or PostgreSQL.
//!
//! ```no_run
//! use identity_store::{DataStoreConfig, IdentityStore, SignupData};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DataStoreConfig::from_env()?;
//! let identity = IdentityStore::connect(&config).await?;
//!
//! let user = identity
//!     .users()
//!     .create_user(SignupData::new("a@x.com", "secret1"))
//!     .await?;
//! assert!(user.is_active);
//! # Ok(())
//! # }
//! ```

mod identity;
mod oauth2;
mod password;
mod storage;
mod userdb;

#[cfg(test)]
mod test_utils;

pub use identity::IdentityStore;

pub use oauth2::{
    AccountSearchField, NewOAuthAccount, OAuthAccount, OAuthAccountError, OAuthAccountStore,
    TokenUpdate,
};

pub use password::{BCRYPT_COST, PasswordError, hash_password, verify_password};

pub use storage::{
    DEFAULT_DATA_STORE_URL, DEFAULT_TABLE_PREFIX, DataStore, DataStoreConfig, DataStoreType,
    StorageError, connect,
};

pub use userdb::{
    BusinessGoal, CompanySize, SignupData, User, UserError, UserRole, UserStore, UserUpdate,
};
