//! Shared setup for unit tests
//!
//! Every helper opens its own `sqlite::memory:` database, so tests never see
//! each other's rows and can run in parallel.

use std::sync::Arc;

use crate::oauth2::OAuthAccountStore;
use crate::storage::{DataStore, DataStoreConfig, connect};
use crate::userdb::UserStore;

/// A fresh, empty in-memory SQLite store
pub(crate) async fn connect_memory_store() -> Arc<dyn DataStore> {
    let config = DataStoreConfig::new("sqlite::memory:").expect("memory url should parse");
    connect(&config)
        .await
        .expect("in-memory sqlite should connect")
}

/// A `UserStore` over a fresh database with its table created
pub(crate) async fn init_user_store() -> UserStore {
    let store = UserStore::new(connect_memory_store().await, "test_users");
    store.init().await.expect("users table should initialize");
    store
}

/// An `OAuthAccountStore` over a fresh database with its table created
pub(crate) async fn init_oauth_account_store() -> OAuthAccountStore {
    let store = OAuthAccountStore::new(connect_memory_store().await, "test_oauth_accounts");
    store
        .init()
        .await
        .expect("oauth accounts table should initialize");
    store
}

/// Close the underlying pool so every later query fails
pub(crate) async fn close_store(store: &Arc<dyn DataStore>) {
    if let Some(pool) = store.as_sqlite() {
        pool.close().await;
    }
    if let Some(pool) = store.as_postgres() {
        pool.close().await;
    }
}
