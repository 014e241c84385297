use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::storage::{
    ColumnValue, MAX_UPDATE_ATTEMPTS, next_updated_at, push_assignments, sql_in_list,
    validate_sqlite_table_schema,
};
use crate::userdb::{
    errors::UserError,
    types::{CompanySize, User, UserRole, UserRow, UserSearchField, goals_to_json},
};

// SQLite implementations
pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
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
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the User table schema matches what we expect
pub(super) async fn validate_user_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), UserError> {
    let expected_columns = [
        ("id", "TEXT"),
        ("email", "TEXT"),
        ("password", "TEXT"),
        ("first_name", "TEXT"),
        ("last_name", "TEXT"),
        ("profile_image_url", "TEXT"),
        ("role", "TEXT"),
        ("company_name", "TEXT"),
        ("company_size", "TEXT"),
        ("industry", "TEXT"),
        ("goals", "TEXT"),
        ("is_active", "BOOLEAN"),
        ("google_id", "TEXT"),
        ("github_id", "TEXT"),
        ("created_at", "TIMESTAMP"),
        ("updated_at", "TIMESTAMP"),
    ];

    validate_sqlite_table_schema(pool, table_name, &expected_columns, UserError::Storage).await
}

pub(super) async fn get_user_by_field_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    field: &UserSearchField,
) -> Result<Option<User>, UserError> {
    let (query, value) = match field {
        UserSearchField::Id(id) => (
            format!("SELECT * FROM {table_name} WHERE id = ?"),
            id.as_str(),
        ),
        UserSearchField::Email(email) => (
            format!("SELECT * FROM {table_name} WHERE email = ?"),
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

pub(super) async fn insert_user_sqlite(
    pool: &Pool<Sqlite>,
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
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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

/// Write `changes` to one user and return the stored row, `None` when `id` is unknown.
///
/// Only the given columns are written. The statement is conditional on the
/// `updated_at` text just read, so `updated_at` never moves backwards when
/// another writer gets in between; that case re-reads and tries again.
pub(super) async fn update_user_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    changes: &[(&'static str, ColumnValue)],
    email: Option<&str>,
) -> Result<Option<User>, UserError> {
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        let current: Option<(String, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT CAST(updated_at AS TEXT), updated_at FROM {table_name} WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string()))?;

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

        let row = query
            .build_query_as::<UserRow>()
            .fetch_optional(pool)
            .await
            .map_err(|e| UserError::from_write(e, email.unwrap_or_default()))?;

        if let Some(row) = row {
            return User::try_from(row).map(Some);
        }
        tracing::debug!("User changed since it was read, retrying");
    }

    Err(UserError::Storage(format!(
        "user {id} kept changing, gave up after {MAX_UPDATE_ATTEMPTS} attempts"
    )))
}
