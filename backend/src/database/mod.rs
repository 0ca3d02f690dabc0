//! Module for database connection setup.
//!
//! Opens the configured SQLite store and hands it out behind the
//! [`MarketStore`] trait so the rest of the backend never names the engine.

use std::sync::Arc;

use market_store::{MarketStore, SqliteStore};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::AppError;

pub fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn MarketStore>, AppError> {
    let store = SqliteStore::open(&config.path)?;
    info!(path = %config.path.display(), "database ready");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[tokio::test]
    async fn opens_an_in_memory_store() {
        let store = open_store(&DatabaseConfig {
            path: PathBuf::from(":memory:"),
        })
        .unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
    }
}
