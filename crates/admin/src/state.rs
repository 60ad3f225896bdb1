//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, BotApi, BotApiClient, CachedApi, QueryCache};
use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: Arc<dyn BotApi>,
}

impl AppState {
    /// Build state around the real backend client, wrapped in the query cache.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, ApiError> {
        let client = BotApiClient::new(&config.bot_api)?;
        let cache = QueryCache::new(config.cache);
        Ok(Self::with_api(config, Arc::new(CachedApi::new(client, cache))))
    }

    /// Build state around any backend implementation.
    #[must_use]
    pub fn with_api(config: AdminConfig, api: Arc<dyn BotApi>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, api }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// The bot backend.
    #[must_use]
    pub fn api(&self) -> &dyn BotApi {
        self.inner.api.as_ref()
    }
}
