use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::config::Config;
use crate::db::Store;
use crate::services::{LogMailer, Mailer, TokenService};

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: TokenService,

    pub mailer: Arc<dyn Mailer>,

    pub limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        Self::with_mailer(config, Arc::new(LogMailer)).await
    }

    /// Same as [`Self::new`] but with an injected mail transport.
    pub async fn with_mailer(
        config: Config,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Arc<Self>> {
        let store = Store::with_pool_options(
            &config.database.connection_url(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.jwt_expiry_seconds);
        let limiter = RateLimiter::new(&config.rate_limit);

        Ok(Arc::new(Self {
            config: Arc::new(config),
            store,
            tokens,
            mailer,
            limiter,
        }))
    }
}
