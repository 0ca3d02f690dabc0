//! Shared application state handed to every request handler.

use std::sync::Arc;

use market_store::MarketStore;

use crate::auth::AuthService;
use crate::config::Config;
use crate::errors::AppError;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub auth: Arc<AuthService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MarketStore>) -> Result<Self, AppError> {
        let auth = AuthService::new(&config.auth)
            .map_err(|e| AppError::config(e.to_string()))?;
        Ok(Self {
            store,
            auth: Arc::new(auth),
            config: Arc::new(config),
        })
    }
}
