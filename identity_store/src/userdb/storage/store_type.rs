use std::sync::Arc;

use crate::password::{hash_password, verify_password};
use crate::storage::{DataStore, storage_now};
use crate::userdb::{
    errors::UserError,
    types::{SignupData, User, UserSearchField, UserUpdate},
};

use super::postgres::*;
use super::sqlite::*;

/// Create/read/update access to user records
#[derive(Clone)]
pub struct UserStore {
    store: Arc<dyn DataStore>,
    table_name: String,
}

impl UserStore {
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

    /// Create the users table if needed and check its columns
    pub async fn init(&self) -> Result<(), UserError> {
        match (self.store.as_sqlite(), self.store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool, &self.table_name).await?;
                validate_user_tables_sqlite(pool, &self.table_name).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool, &self.table_name).await?;
                validate_user_tables_postgres(pool, &self.table_name).await?;
                Ok(())
            }
            _ => Err(UserError::Storage("Unsupported database type".to_string())),
        }
    }

    /// `Ok(None)` when no user has this id; `Err` only for real faults
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, UserError> {
        self.get_user_by(UserSearchField::Id(id.to_string())).await
    }

    /// Exact, case-sensitive match on the stored email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        self.get_user_by(UserSearchField::Email(email.to_string())).await
    }

    #[tracing::instrument(skip(self, field), fields(user_field = %field))]
    pub(crate) async fn get_user_by(&self, field: UserSearchField) -> Result<Option<User>, UserError> {
        let result = if let Some(pool) = self.store.as_sqlite() {
            get_user_by_field_sqlite(pool, &self.table_name, &field).await
        } else if let Some(pool) = self.store.as_postgres() {
            get_user_by_field_postgres(pool, &self.table_name, &field).await
        } else {
            Err(UserError::Storage("Unsupported database type".to_string()))
        };

        match &result {
            Ok(Some(_)) => {
                tracing::info!(found = true, "User lookup completed");
            }
            Ok(None) => {
                tracing::info!(found = false, "User lookup completed - not found");
            }
            Err(e) => {
                tracing::error!(error = %e, "User lookup failed");
            }
        }

        result
    }

    /// Register a new user from a signup form.
    ///
    /// The password is hashed before anything is written, `confirm_password`
    /// is dropped and the account always starts active. A duplicate email
    /// fails with [`UserError::Conflict`].
    #[tracing::instrument(skip_all)]
    pub async fn create_user(&self, signup: SignupData) -> Result<User, UserError> {
        signup.validate()?;

        let SignupData {
            email,
            password,
            confirm_password: _,
            first_name,
            last_name,
            profile_image_url,
            role,
            company_name,
            company_size,
            industry,
            goals,
            is_active: _,
            google_id,
            github_id,
        } = signup;

        let password_hash = hash_password(&password).await?;
        let now = storage_now();

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password: Some(password_hash),
            first_name,
            last_name,
            profile_image_url,
            role,
            company_name,
            company_size,
            industry,
            goals,
            is_active: true,
            google_id,
            github_id,
            created_at: now,
            updated_at: now,
        };

        let result = if let Some(pool) = self.store.as_sqlite() {
            insert_user_sqlite(pool, &self.table_name, &user).await
        } else if let Some(pool) = self.store.as_postgres() {
            insert_user_postgres(pool, &self.table_name, &user).await
        } else {
            Err(UserError::Storage("Unsupported database type".to_string()))
        };

        match result {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "User created");
                Ok(user)
            }
            Err(e @ UserError::Conflict(_)) => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "User creation failed");
                Err(e)
            }
        }
    }

    /// Apply `update` to the stored user and return the result.
    ///
    /// Returns `Ok(None)` when `id` does not exist. A new password is hashed
    /// before anything is written. Only the fields set in `update` are
    /// written, in one statement, so concurrent updates of different fields
    /// all land. `updated_at` always moves forward.
    #[tracing::instrument(skip(self, id, update), fields(user_id = %id))]
    pub async fn update_user(
        &self,
        id: &str,
        mut update: UserUpdate,
    ) -> Result<Option<User>, UserError> {
        update.validate()?;

        let password_hash = match update.password.take() {
            Some(password) => Some(hash_password(&password).await?),
            None => None,
        };
        let email = update.email.clone();
        let changes = update.into_columns(password_hash)?;

        let updated = if let Some(pool) = self.store.as_sqlite() {
            update_user_sqlite(pool, &self.table_name, id, &changes, email.as_deref()).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_user_postgres(pool, &self.table_name, id, &changes, email.as_deref()).await
        } else {
            Err(UserError::Storage("Unsupported database type".to_string()))
        };

        match updated {
            Ok(Some(user)) => {
                tracing::info!("User updated");
                Ok(Some(user))
            }
            Ok(None) => Ok(None),
            Err(e @ UserError::Conflict(_)) => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "User update failed");
                Err(e)
            }
        }
    }

    /// Look up `email` and check `password` against its stored hash.
    ///
    /// `Ok(None)` covers an unknown email, a wrong password and an account
    /// without a password.
    #[tracing::instrument(skip_all)]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserError> {
        let Some(user) = self.get_user_by_email(email).await? else {
            return Ok(None);
        };
        let Some(hash) = user.password.as_deref() else {
            return Ok(None);
        };

        if verify_password(password, hash).await? {
            Ok(Some(user))
        } else {
            tracing::info!(user_id = %user.id, "Password mismatch");
            Ok(None)
        }
    }
}
