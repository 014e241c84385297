//! Connection handle shared by every store

use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Postgres, Sqlite};

use super::config::{DataStoreConfig, DataStoreType};
use super::errors::StorageError;

// Types
#[derive(Clone, Debug)]
pub(crate) struct SqliteDataStore {
    pub(super) pool: sqlx::SqlitePool,
}

#[derive(Clone, Debug)]
pub(crate) struct PostgresDataStore {
    pub(super) pool: sqlx::PgPool,
}

// Trait
pub trait DataStore: Send + Sync {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>>;
    fn as_postgres(&self) -> Option<&Pool<Postgres>>;
}

// Store implementations
impl DataStore for SqliteDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        Some(&self.pool)
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        None
    }
}

impl DataStore for PostgresDataStore {
    fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        None
    }

    fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        Some(&self.pool)
    }
}

/// Open the pool described by `config`.
///
/// Connects eagerly so an unreachable database is reported here rather than
/// on the first query.
pub async fn connect(config: &DataStoreConfig) -> Result<Arc<dyn DataStore>, StorageError> {
    config.validate()?;

    tracing::info!(
        store_type = config.store_type.as_str(),
        "Initializing data store"
    );

    let store: Arc<dyn DataStore> = match config.store_type {
        DataStoreType::Sqlite => {
            let opts = SqliteConnectOptions::from_str(&config.url)
                .map_err(|e| StorageError::Config(e.to_string()))?
                .create_if_missing(true);

            // Every connection to `:memory:` is its own database, so keep exactly one alive.
            let pool_options = if config.is_in_memory() {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            } else {
                SqlitePoolOptions::new()
            };

            let pool = pool_options
                .connect_with(opts)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            Arc::new(SqliteDataStore { pool })
        }
        DataStoreType::Postgres => {
            let pool = PgPoolOptions::new()
                .connect(&config.url)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

            Arc::new(PostgresDataStore { pool })
        }
    };

    tracing::info!(
        store_type = config.store_type.as_str(),
        "Connected to database"
    );

    Ok(store)
}
