//! Persistence Adapters - Trade Storage Backends
//!
//! Implements the `TradeRepository` port twice: a Postgres JSONB
//! document store and an in-memory table. The backend is chosen once at
//! startup by [`connect_repository`]:
//!
//! - no `database_url`: in-memory, with a warning
//! - connection fails and `require_database` is set: startup error
//! - connection fails otherwise: in-memory, with a warning
//! - connection succeeds: Postgres

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPool;
use tracing::{info, warn};

pub use memory::InMemoryTradeStore;
pub use postgres::PgTradeStore;

use crate::config::PersistenceConfig;
use crate::ports::repository::{StorageBackend, SharedRepository};

/// The selected repository plus the resources it owns.
pub struct StorageContext {
    /// Repository injected into the journal.
    pub repository: SharedRepository,
    /// Connection pool, present only for the Postgres backend.
    pub pool: Option<PgPool>,
}

impl StorageContext {
    /// Fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self {
            repository: Arc::new(InMemoryTradeStore::new()),
            pool: None,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.repository.backend()
    }

    /// Close the connection pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Postgres pool closed");
        }
    }
}

/// Select and connect the storage backend.
///
/// # Errors
/// Fails only when the database is configured, unreachable and
/// `require_database` is set.
pub async fn connect_repository(config: &PersistenceConfig) -> anyhow::Result<StorageContext> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set; trades are kept in memory and lost on restart");
        return Ok(StorageContext::in_memory());
    };

    match PgTradeStore::connect(url, config.max_connections, config.connect_timeout()).await {
        Ok(store) => {
            let pool = store.pool().clone();
            Ok(StorageContext {
                repository: Arc::new(store),
                pool: Some(pool),
            })
        }
        Err(e) if config.require_database => {
            Err(e).context("Document store is required but could not be reached")
        }
        Err(e) => {
            warn!(error = %e, "Document store unreachable; falling back to in-memory storage");
            Ok(StorageContext::in_memory())
        }
    }
}
