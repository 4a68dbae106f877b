use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::db::PgStore;
use crate::invoices::repo::InvoiceRepo;
use crate::memory::MemoryStore;
use crate::products::repo::ProductRepo;
use crate::users::repo::UserRepo;

/// Shared handles every handler borrows. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub products: Arc<dyn ProductRepo>,
    pub users: Arc<dyn UserRepo>,
    pub invoices: Arc<dyn InvoiceRepo>,
    pg: Option<PgStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        match config.storage {
            StorageBackend::Postgres => {
                let store = PgStore::connect(&config).await?;
                let mut state = Self::from_store(config, Arc::new(store.clone()));
                state.pg = Some(store);
                Ok(state)
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on exit");
                Ok(Self::from_store(config, Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn from_store<S>(config: Arc<AppConfig>, store: Arc<S>) -> Self
    where
        S: ProductRepo + UserRepo + InvoiceRepo + 'static,
    {
        Self {
            config,
            products: store.clone(),
            users: store.clone(),
            invoices: store,
            pg: None,
        }
    }

    /// Fresh empty in-memory state with default config.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::from_store(
            Arc::new(AppConfig {
                storage: StorageBackend::Memory,
                ..AppConfig::default()
            }),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Releases the storage connection.
    pub async fn close(&self) {
        if let Some(pg) = &self.pg {
            pg.close().await;
        }
    }
}
