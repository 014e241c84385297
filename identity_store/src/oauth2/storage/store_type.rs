use std::sync::Arc;

use crate::oauth2::{
    errors::OAuthAccountError,
    types::{AccountSearchField, NewOAuthAccount, OAuthAccount, TokenUpdate},
};
use crate::storage::{DataStore, storage_now};

use super::postgres::*;
use super::sqlite::*;

/// Links between users and their external provider identities
#[derive(Clone)]
pub struct OAuthAccountStore {
    store: Arc<dyn DataStore>,
    table_name: String,
}

impl OAuthAccountStore {
    /// `table_name` must already have passed [`DataStoreConfig::validate`](crate::DataStoreConfig::validate)
    pub(crate) fn new(store: Arc<dyn DataStore>, table_name: impl Into<String>) -> Self {
        Self {
            store,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the accounts table and its user index if needed, then check columns
    pub async fn init(&self) -> Result<(), OAuthAccountError> {
        match (self.store.as_sqlite(), self.store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool, &self.table_name).await?;
                validate_oauth_account_tables_sqlite(pool, &self.table_name).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool, &self.table_name).await?;
                validate_oauth_account_tables_postgres(pool, &self.table_name).await?;
                Ok(())
            }
            _ => Err(OAuthAccountError::Storage(
                "Unsupported database type".to_string(),
            )),
        }
    }

    /// Store a newly linked provider identity.
    ///
    /// Fails with [`OAuthAccountError::Conflict`] when the same
    /// `(provider, provider_account_id)` is already linked, to any user.
    #[tracing::instrument(skip(self, new), fields(provider = %new.provider))]
    pub async fn create_account(
        &self,
        new: NewOAuthAccount,
    ) -> Result<OAuthAccount, OAuthAccountError> {
        new.validate()?;

        let now = storage_now();
        let account = OAuthAccount {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            provider: new.provider,
            provider_account_id: new.provider_account_id,
            access_token: new.access_token,
            refresh_token: new.refresh_token,
            expires_at: new.expires_at,
            token_type: new.token_type,
            scope: new.scope,
            created_at: now,
            updated_at: now,
        };

        let result = if let Some(pool) = self.store.as_sqlite() {
            insert_account_sqlite(pool, &self.table_name, &account).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_account_postgres(pool, &self.table_name, &account).await
        } else {
            Err(OAuthAccountError::Storage(
                "Unsupported database type".to_string(),
            ))
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    account_id = %account.id,
                    user_id = %account.user_id,
                    "OAuth account linked"
                );
                Ok(account)
            }
            Err(e @ OAuthAccountError::Conflict(_)) => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "OAuth account creation failed");
                Err(e)
            }
        }
    }

    /// All accounts matching `field`, oldest first. Empty when none match.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get_accounts_by(
        &self,
        field: AccountSearchField,
    ) -> Result<Vec<OAuthAccount>, OAuthAccountError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_accounts_by_field_sqlite(pool, &self.table_name, &field).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_accounts_by_field_postgres(pool, &self.table_name, &field).await
        } else {
            Err(OAuthAccountError::Storage(
                "Unsupported database type".to_string(),
            ))
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "OAuth account lookup failed");
        }
        result
    }

    /// The account for one provider identity, used to resolve a sign-in
    #[tracing::instrument(skip(self, provider_account_id))]
    pub async fn get_account_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<OAuthAccount>, OAuthAccountError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_account_by_provider_sqlite(pool, &self.table_name, provider, provider_account_id)
                .await
        } else if let Some(pool) = self.store.as_postgres() {
            get_account_by_provider_postgres(pool, &self.table_name, provider, provider_account_id)
                .await
        } else {
            Err(OAuthAccountError::Storage(
                "Unsupported database type".to_string(),
            ))
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "Provider account lookup"),
            Err(e) => tracing::error!(error = %e, "Provider account lookup failed"),
        }
        result
    }

    /// Replace the token fields set in `update`; identity fields never change.
    ///
    /// Only the given token columns are written, in one statement. Returns
    /// `Ok(None)` when `id` does not exist.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_tokens(
        &self,
        id: &str,
        update: TokenUpdate,
    ) -> Result<Option<OAuthAccount>, OAuthAccountError> {
        let changes = update.into_columns();

        let updated = if let Some(pool) = self.store.as_sqlite() {
            update_tokens_sqlite(pool, &self.table_name, id, &changes).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_tokens_postgres(pool, &self.table_name, id, &changes).await
        } else {
            Err(OAuthAccountError::Storage(
                "Unsupported database type".to_string(),
            ))
        };

        match updated {
            Ok(Some(account)) => {
                tracing::info!("OAuth tokens updated");
                Ok(Some(account))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!(error = %e, "OAuth token update failed");
                Err(e)
            }
        }
    }
}
