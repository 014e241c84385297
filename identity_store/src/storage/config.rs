//! Database connection and table configuration

use std::env;
use std::str::FromStr;

use super::errors::StorageError;

/// Connection string used when `GENERIC_DATA_STORE_URL` is not set
pub const DEFAULT_DATA_STORE_URL: &str = "postgres://localhost:5432/identity";

/// Table prefix used when `DB_TABLE_PREFIX` is not set
pub const DEFAULT_TABLE_PREFIX: &str = "idn_";

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStoreType {
    Sqlite,
    Postgres,
}

impl DataStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Guess the engine from the scheme of a connection string
    pub fn from_url(url: &str) -> Result<Self, StorageError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else {
            Err(StorageError::Config(format!(
                "Cannot infer store type from url '{url}'. Set GENERIC_DATA_STORE_TYPE"
            )))
        }
    }
}

impl FromStr for DataStoreType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" => Ok(Self::Postgres),
            t => Err(StorageError::Config(format!(
                "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
            ))),
        }
    }
}

/// Everything needed to open the identity database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStoreConfig {
    pub store_type: DataStoreType,
    pub url: String,
    pub users_table: String,
    pub oauth_accounts_table: String,
}

impl DataStoreConfig {
    /// Build a config for `url` with the default table names
    pub fn new(url: impl Into<String>) -> Result<Self, StorageError> {
        let url = url.into();
        let store_type = DataStoreType::from_url(&url)?;
        Ok(Self {
            store_type,
            url,
            users_table: format!("{DEFAULT_TABLE_PREFIX}users"),
            oauth_accounts_table: format!("{DEFAULT_TABLE_PREFIX}oauth_accounts"),
        })
    }

    /// Read the configuration from the process environment
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GENERIC_DATA_STORE_URL` | [`DEFAULT_DATA_STORE_URL`] |
    /// | `GENERIC_DATA_STORE_TYPE` | inferred from the url scheme |
    /// | `DB_TABLE_PREFIX` | [`DEFAULT_TABLE_PREFIX`] |
    /// | `DB_TABLE_USERS` | `{prefix}users` |
    /// | `DB_TABLE_OAUTH_ACCOUNTS` | `{prefix}oauth_accounts` |
    pub fn from_env() -> Result<Self, StorageError> {
        let url = env::var("GENERIC_DATA_STORE_URL")
            .unwrap_or_else(|_| DEFAULT_DATA_STORE_URL.to_string());

        let store_type = match env::var("GENERIC_DATA_STORE_TYPE") {
            Ok(t) => t.parse()?,
            Err(_) => DataStoreType::from_url(&url)?,
        };

        let prefix =
            env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| DEFAULT_TABLE_PREFIX.to_string());
        let users_table =
            env::var("DB_TABLE_USERS").unwrap_or_else(|_| format!("{prefix}users"));
        let oauth_accounts_table = env::var("DB_TABLE_OAUTH_ACCOUNTS")
            .unwrap_or_else(|_| format!("{prefix}oauth_accounts"));

        let config = Self {
            store_type,
            url,
            users_table,
            oauth_accounts_table,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace both table names with `{prefix}users` / `{prefix}oauth_accounts`
    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.users_table = format!("{prefix}users");
        self.oauth_accounts_table = format!("{prefix}oauth_accounts");
        self
    }

    /// Table names are interpolated into SQL, so only plain unqualified
    /// identifiers are accepted: ASCII letters, digits and `_`, not starting
    /// with a digit.
    pub fn validate(&self) -> Result<(), StorageError> {
        for table in [&self.users_table, &self.oauth_accounts_table] {
            let valid = table
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(StorageError::Config(format!(
                    "Invalid table name: '{table}'"
                )));
            }
        }
        Ok(())
    }

    /// Whether the url points at a SQLite in-memory database
    pub(crate) fn is_in_memory(&self) -> bool {
        self.store_type == DataStoreType::Sqlite
            && (self.url.contains(":memory:") || self.url.contains("mode=memory"))
    }
}
