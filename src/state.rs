use crate::config::{AppConfig, StoreConfig};
use crate::users::{
    memory::InMemoryUserStore,
    repo::{PgUserStore, UserStore},
    services::UserService,
};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = match &config.store {
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(*max_connections)
                    .connect(database_url)
                    .await
                    .context("connect to database")?;

                let store = PgUserStore::new(db.clone());
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; creating users table directly");
                    store.ensure_schema().await.context("create users table")?;
                }
                Arc::new(store) as Arc<dyn UserStore>
            }
            StoreConfig::Memory => {
                tracing::warn!("USER_STORE=memory, users are lost on restart");
                Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self::from_parts(Arc::new(config), store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        Self {
            config,
            users: Arc::new(UserService::new(store)),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreConfig::Memory,
        });
        Self::from_parts(config, Arc::new(InMemoryUserStore::new()))
    }
}
