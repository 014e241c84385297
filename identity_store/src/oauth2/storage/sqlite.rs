use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::oauth2::{
    errors::OAuthAccountError,
    types::{AccountSearchField, OAuthAccount},
};
use crate::storage::{
    ColumnValue, MAX_UPDATE_ATTEMPTS, next_updated_at, push_assignments,
    validate_sqlite_table_schema,
};

pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), OAuthAccountError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_account_id TEXT NOT NULL,
            access_token TEXT,
            refresh_token TEXT,
            expires_at TIMESTAMP,
            token_type TEXT,
            scope TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE(provider, provider_account_id)
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table_name}_user_id ON {table_name}(user_id)"
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn validate_oauth_account_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), OAuthAccountError> {
    let expected_columns = [
        ("id", "TEXT"),
        ("user_id", "TEXT"),
        ("provider", "TEXT"),
        ("provider_account_id", "TEXT"),
        ("access_token", "TEXT"),
        ("refresh_token", "TEXT"),
        ("expires_at", "TIMESTAMP"),
        ("token_type", "TEXT"),
        ("scope", "TEXT"),
        ("created_at", "TIMESTAMP"),
        ("updated_at", "TIMESTAMP"),
    ];

    validate_sqlite_table_schema(
        pool,
        table_name,
        &expected_columns,
        OAuthAccountError::Storage,
    )
    .await
}

pub(super) async fn get_accounts_by_field_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    field: &AccountSearchField,
) -> Result<Vec<OAuthAccount>, OAuthAccountError> {
    let (column, value) = match field {
        AccountSearchField::Id(id) => ("id", id.as_str()),
        AccountSearchField::UserId(user_id) => ("user_id", user_id.as_str()),
        AccountSearchField::Provider(provider) => ("provider", provider.as_str()),
    };

    sqlx::query_as::<_, OAuthAccount>(&format!(
        "SELECT * FROM {table_name} WHERE {column} = ? ORDER BY created_at, id"
    ))
    .bind(value)
    .fetch_all(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))
}

pub(super) async fn get_account_by_provider_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    provider: &str,
    provider_account_id: &str,
) -> Result<Option<OAuthAccount>, OAuthAccountError> {
    sqlx::query_as::<_, OAuthAccount>(&format!(
        "SELECT * FROM {table_name} WHERE provider = ? AND provider_account_id = ?"
    ))
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))
}

pub(super) async fn insert_account_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    account: &OAuthAccount,
) -> Result<(), OAuthAccountError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (
            id, user_id, provider, provider_account_id, access_token, refresh_token,
            expires_at, token_type, scope, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(&account.id)
    .bind(&account.user_id)
    .bind(&account.provider)
    .bind(&account.provider_account_id)
    .bind(&account.access_token)
    .bind(&account.refresh_token)
    .bind(account.expires_at)
    .bind(&account.token_type)
    .bind(&account.scope)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(pool)
    .await
    .map_err(|e| OAuthAccountError::from_write(e, &account.provider))?;

    Ok(())
}

/// Write token `changes` to one account and return the stored row, `None` when `id` is unknown.
///
/// Conditional on the `updated_at` text just read; a concurrent writer makes it
/// re-read and try again so `updated_at` never moves backwards.
pub(super) async fn update_tokens_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    changes: &[(&'static str, ColumnValue)],
) -> Result<Option<OAuthAccount>, OAuthAccountError> {
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        let current: Option<(String, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT CAST(updated_at AS TEXT), updated_at FROM {table_name} WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| OAuthAccountError::Storage(e.to_string()))?;

        let Some((stored, previous)) = current else {
            return Ok(None);
        };

        let mut query =
            QueryBuilder::<Sqlite>::new(format!("UPDATE {table_name} SET updated_at = "));
        query.push_bind(next_updated_at(previous));
        push_assignments(&mut query, changes);
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND updated_at = ")
            .push_bind(stored)
            .push(" RETURNING *");

        let account = query
            .build_query_as::<OAuthAccount>()
            .fetch_optional(pool)
            .await
            .map_err(|e| OAuthAccountError::Storage(e.to_string()))?;

        if account.is_some() {
            return Ok(account);
        }
    }

    Err(OAuthAccountError::Storage(format!(
        "account {id} kept changing, gave up after {MAX_UPDATE_ATTEMPTS} attempts"
    )))
}
