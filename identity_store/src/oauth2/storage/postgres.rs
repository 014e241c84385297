use sqlx::{Pool, Postgres, QueryBuilder};

use crate::oauth2::{
    errors::OAuthAccountError,
    types::{AccountSearchField, OAuthAccount},
};
use crate::storage::{
    ColumnValue, push_assignments, storage_now, validate_postgres_table_schema,
};

pub(super) async fn create_tables_postgres(
    pool: &Pool<Postgres>,
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
            expires_at TIMESTAMPTZ,
            token_type TEXT,
            scope TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
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

pub(super) async fn validate_oauth_account_tables_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
) -> Result<(), OAuthAccountError> {
    let expected_columns = [
        ("id", "text"),
        ("user_id", "text"),
        ("provider", "text"),
        ("provider_account_id", "text"),
        ("access_token", "text"),
        ("refresh_token", "text"),
        ("expires_at", "timestamp with time zone"),
        ("token_type", "text"),
        ("scope", "text"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(
        pool,
        table_name,
        &expected_columns,
        OAuthAccountError::Storage,
    )
    .await
}

pub(super) async fn get_accounts_by_field_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    field: &AccountSearchField,
) -> Result<Vec<OAuthAccount>, OAuthAccountError> {
    let (column, value) = match field {
        AccountSearchField::Id(id) => ("id", id.as_str()),
        AccountSearchField::UserId(user_id) => ("user_id", user_id.as_str()),
        AccountSearchField::Provider(provider) => ("provider", provider.as_str()),
    };

    sqlx::query_as::<_, OAuthAccount>(&format!(
        "SELECT * FROM {table_name} WHERE {column} = $1 ORDER BY created_at, id"
    ))
    .bind(value)
    .fetch_all(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))
}

pub(super) async fn get_account_by_provider_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    provider: &str,
    provider_account_id: &str,
) -> Result<Option<OAuthAccount>, OAuthAccountError> {
    sqlx::query_as::<_, OAuthAccount>(&format!(
        "SELECT * FROM {table_name} WHERE provider = $1 AND provider_account_id = $2"
    ))
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| OAuthAccountError::Storage(e.to_string()))
}

pub(super) async fn insert_account_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    account: &OAuthAccount,
) -> Result<(), OAuthAccountError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (
            id, user_id, provider, provider_account_id, access_token, refresh_token,
            expires_at, token_type, scope, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
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

/// Write token `changes` to one account in a single statement, `None` when `id` is unknown
pub(super) async fn update_tokens_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    changes: &[(&'static str, ColumnValue)],
) -> Result<Option<OAuthAccount>, OAuthAccountError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "UPDATE {table_name} SET updated_at = GREATEST("
    ));
    query
        .push_bind(storage_now())
        .push(", updated_at + INTERVAL '1 microsecond')");
    push_assignments(&mut query, changes);
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    query
        .build_query_as::<OAuthAccount>()
        .fetch_optional(pool)
        .await
        .map_err(|e| OAuthAccountError::Storage(e.to_string()))
}
