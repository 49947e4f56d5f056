use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use crate::auth::repo::{PgSignupStore, SignupStore};
use crate::config::{AppConfig, IdentityBackend, StoreBackend};
use crate::identity::{
    local::LocalIdentityProvider, supabase::SupabaseIdentityProvider, IdentityProvider,
};
use crate::memory::{MemoryIdentityProvider, MemorySignupStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<PgPool>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn SignupStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = match (&config.database_url, config.needs_database()) {
            (Some(url), true) => Some(
                PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?,
            ),
            _ => None,
        };

        let store: Arc<dyn SignupStore> = match (config.store, &db) {
            (StoreBackend::Postgres, Some(pool)) => Arc::new(PgSignupStore::new(pool.clone())),
            (StoreBackend::Postgres, None) => anyhow::bail!("postgres store without a pool"),
            (StoreBackend::Memory, _) => Arc::new(MemorySignupStore::new()),
        };

        let identity: Arc<dyn IdentityProvider> = match (&config.identity, &db) {
            (IdentityBackend::Local, Some(pool)) => {
                Arc::new(LocalIdentityProvider::new(pool.clone()))
            }
            (IdentityBackend::Local, None) => anyhow::bail!("local identities without a pool"),
            (IdentityBackend::Supabase(cfg), _) => Arc::new(SupabaseIdentityProvider::new(cfg)),
            (IdentityBackend::Memory, _) => Arc::new(MemoryIdentityProvider::new()),
        };

        Ok(Self {
            config: Arc::new(config),
            db,
            identity,
            store,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn SignupStore>,
    ) -> Self {
        Self {
            config,
            db: None,
            identity,
            store,
        }
    }

    /// State backed entirely by in-process maps.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::in_memory()),
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(MemorySignupStore::new()),
        )
    }
}
