use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use tracing::info;

use crate::auth::{jwt::JwtKeys, services::CredentialManager};
use crate::config::AppConfig;
use crate::store::{InMemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: CredentialManager,
}

impl AppState {
    /// Picks the user store from config, then seeds the admin account if one is configured.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = PgUserStore::new(db);
                store.migrate().await?;
                info!("using postgres user store");
                Arc::new(store)
            }
            None => {
                info!("DATABASE_URL not set; using in-memory user store");
                Arc::new(InMemoryUserStore::new())
            }
        };

        let state = Self::from_parts(Arc::new(config), store);
        if let Some(seed) = &state.config.admin {
            state
                .accounts
                .ensure_admin(seed)
                .await
                .context("seed admin account")?;
        }
        Ok(state)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            accounts: CredentialManager::new(store, keys),
            config,
        }
    }

    /// In-memory state with the test configuration.
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(InMemoryUserStore::new()),
        )
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.keys().clone()
    }
}
