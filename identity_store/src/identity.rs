use crate::oauth2::OAuthAccountStore;
use crate::storage::{DataStoreConfig, StorageError, connect};
use crate::userdb::UserStore;

/// Process-wide handle to the identity tables.
///
/// Built once at startup and passed to whatever needs it. Clones share the
/// same connection pool.
#[derive(Clone)]
pub struct IdentityStore {
    users: UserStore,
    oauth_accounts: OAuthAccountStore,
}

impl IdentityStore {
    /// Connect to the database in `config` and create both tables if needed
    pub async fn connect(config: &DataStoreConfig) -> Result<Self, StorageError> {
        let store = connect(config).await?;

        let users = UserStore::new(store.clone(), config.users_table.clone());
        users
            .init()
            .await
            .map_err(|e| StorageError::Storage(format!("users table: {e}")))?;

        let oauth_accounts = OAuthAccountStore::new(store, config.oauth_accounts_table.clone());
        oauth_accounts
            .init()
            .await
            .map_err(|e| StorageError::Storage(format!("oauth accounts table: {e}")))?;

        tracing::info!(
            users_table = users.table_name(),
            oauth_accounts_table = oauth_accounts.table_name(),
            "Identity store ready"
        );

        Ok(Self {
            users,
            oauth_accounts,
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn oauth_accounts(&self) -> &OAuthAccountStore {
        &self.oauth_accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::userdb::SignupData;

    #[tokio::test]
    async fn test_connect_initializes_both_tables() {
        let config = DataStoreConfig::new("sqlite::memory:")
            .unwrap()
            .with_table_prefix("t_");
        let identity = IdentityStore::connect(&config).await.unwrap();

        assert_eq!(identity.users().table_name(), "t_users");
        assert_eq!(identity.oauth_accounts().table_name(), "t_oauth_accounts");

        let found = identity.users().get_user_by_id("missing").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_the_pool() {
        let config = DataStoreConfig::new("sqlite::memory:").unwrap();
        let identity = IdentityStore::connect(&config).await.unwrap();
        let clone = identity.clone();

        let created = identity
            .users()
            .create_user(SignupData::new("shared@x.com", "secret1"))
            .await
            .unwrap();

        let seen = clone.users().get_user_by_id(&created.id).await.unwrap();
        assert_eq!(seen.map(|u| u.email).as_deref(), Some("shared@x.com"));
    }

    #[tokio::test]
    async fn test_invalid_table_name_fails_at_connect() {
        let mut config = DataStoreConfig::new("sqlite::memory:").unwrap();
        config.oauth_accounts_table = "accounts; DROP TABLE x".to_string();

        let result = IdentityStore::connect(&config).await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    /// Schema-qualified names are refused up front instead of failing in SQLite DDL
    #[tokio::test]
    async fn test_qualified_table_name_fails_at_connect() {
        let mut config = DataStoreConfig::new("sqlite::memory:").unwrap();
        config.users_table = "main.u".to_string();

        let result = IdentityStore::connect(&config).await;
        assert!(matches!(result, Err(StorageError::Config(_))), "{:?}", result.err());
    }
}
