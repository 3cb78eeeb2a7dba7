use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::Cache;
use crate::config::Config;

/// Shared application state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<dyn Cache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, cache: Arc<dyn Cache>, config: Config) -> Self {
        Self {
            pool,
            cache,
            config: Arc::new(config),
        }
    }
}
