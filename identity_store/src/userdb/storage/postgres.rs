use sqlx::{Pool, Postgres, QueryBuilder};

use crate::storage::{
    ColumnValue, push_assignments, sql_in_list, storage_now, validate_postgres_table_schema,
};
use crate::userdb::{
    errors::UserError,
    types::{CompanySize, User, UserRole, UserRow, UserSearchField, goals_to_json},
};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
) -> Result<(), UserError> {
    let roles = sql_in_list(UserRole::ALL.iter().map(|r| r.as_str()));
    let sizes = sql_in_list(CompanySize::ALL.iter().map(|s| s.as_str()));

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT,
            first_name TEXT,
            last_name TEXT,
            profile_image_url TEXT,
            role TEXT CHECK (role IS NULL OR role IN ({roles})),
            company_name TEXT,
            company_size TEXT CHECK (company_size IS NULL OR company_size IN ({sizes})),
            industry TEXT,
            goals TEXT NOT NULL DEFAULT '[]',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            google_id TEXT,
            github_id TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the User table schema matches what we expect
pub(super) async fn validate_user_tables_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
) -> Result<(), UserError> {
    let expected_columns = [
        ("id", "text"),
        ("email", "text"),
        ("password", "text"),
        ("first_name", "text"),
        ("last_name", "text"),
        ("profile_image_url", "text"),
        ("role", "text"),
        ("company_name", "text"),
        ("company_size", "text"),
        ("industry", "text"),
        ("goals", "text"),
        ("is_active", "boolean"),
        ("google_id", "text"),
        ("github_id", "text"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(pool, table_name, &expected_columns, UserError::Storage).await
}

pub(super) async fn get_user_by_field_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    field: &UserSearchField,
) -> Result<Option<User>, UserError> {
    let (query, value) = match field {
        UserSearchField::Id(id) => (
            format!("SELECT * FROM {table_name} WHERE id = $1"),
            id.as_str(),
        ),
        UserSearchField::Email(email) => (
            format!("SELECT * FROM {table_name} WHERE email = $1"),
            email.as_str(),
        ),
    };

    sqlx::query_as::<_, UserRow>(&query)
        .bind(value)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?
        .map(User::try_from)
        .transpose()
}

pub(super) async fn insert_user_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    user: &User,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (
            id, email, password, first_name, last_name, profile_image_url,
            role, company_name, company_size, industry, goals, is_active,
            google_id, github_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#
    ))
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.profile_image_url)
    .bind(user.role.map(|r| r.as_str()))
    .bind(&user.company_name)
    .bind(user.company_size.map(|s| s.as_str()))
    .bind(&user.industry)
    .bind(goals_to_json(&user.goals)?)
    .bind(user.is_active)
    .bind(&user.google_id)
    .bind(&user.github_id)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| UserError::from_write(e, &user.email))?;

    Ok(())
}

/// Write `changes` to one user in a single statement and return the stored row.
///
/// `None` when `id` is unknown. Only the given columns are written;
/// `updated_at` is kept strictly increasing by the database itself.
pub(super) async fn update_user_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    changes: &[(&'static str, ColumnValue)],
    email: Option<&str>,
) -> Result<Option<User>, UserError> {
    let mut query = QueryBuilder::<Postgres>::new(format!(
        "UPDATE {table_name} SET updated_at = GREATEST("
    ));
    query
        .push_bind(storage_now())
        .push(", updated_at + INTERVAL '1 microsecond')");
    push_assignments(&mut query, changes);
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    query
        .build_query_as::<UserRow>()
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::from_write(e, email.unwrap_or_default()))?
        .map(User::try_from)
        .transpose()
}
