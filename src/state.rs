//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenService;
use crate::config::Config;
use crate::domain::EventPublisher;
use crate::error::ApiError;
use crate::mailer::Mailer;
use crate::storage::ObjectStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    /// `None` when no bucket is configured
    pub storage: Option<Arc<dyn ObjectStore>>,
    pub mailer: Arc<dyn Mailer>,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        storage: Option<Arc<dyn ObjectStore>>,
        mailer: Arc<dyn Mailer>,
        events: EventPublisher,
    ) -> Self {
        let tokens = TokenService::new(&config);
        Self { db, config: Arc::new(config), tokens, storage, mailer, events }
    }

    pub fn storage(&self) -> Result<&dyn ObjectStore, ApiError> {
        self.storage
            .as_deref()
            .ok_or_else(|| ApiError::Storage("Object storage is not configured".into()))
    }

    pub fn secure_cookies(&self) -> bool { self.config.is_production() }

    /// State over a pool that never connects, for router tests that stop before the database.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Config::for_tests();
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        Self::new(db, config, None, Arc::new(crate::mailer::LogMailer), EventPublisher::default())
    }

    #[cfg(test)]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
