use std::sync::Arc;

use crate::auth::repo::UserRepo;
use crate::config::{AppConfig, JwtConfig, DEFAULT_TOKEN_TTL_MINUTES};
use crate::db::PgStore;
use crate::memory::MemoryStore;
use crate::tasks::repo::TaskRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub tasks: Arc<dyn TaskRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.database_url.as_deref() {
            Some(url) => {
                let store = Arc::new(PgStore::connect(url).await?);
                store.migrate().await?;
                Ok(Self::from_parts(config, store.clone(), store))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
                let store = Arc::new(MemoryStore::new());
                Ok(Self::from_parts(config, store.clone(), store))
            }
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        tasks: Arc<dyn TaskRepo>,
    ) -> Self {
        Self {
            config,
            users,
            tasks,
        }
    }

    /// State over a fresh in-memory store with a fixed test JWT configuration.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            },
        });
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store)
    }
}
