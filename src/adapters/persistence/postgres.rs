//! Postgres Document Store - Persistent Trade Backend
//!
//! Stores each trade as a JSONB document keyed by its id:
//!
//! ```sql
//! trades(id TEXT PRIMARY KEY, doc JSONB NOT NULL, created_at TIMESTAMPTZ NOT NULL DEFAULT now())
//! ```
//!
//! Every query matches exactly on `id`. The table is created on connect
//! if it does not exist yet.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{info, instrument, warn};

use crate::domain::trade::Trade;
use crate::ports::repository::{StorageBackend, StorageError, TradeRepository};

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS trades (
    id         TEXT PRIMARY KEY,
    doc        JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Trade repository backed by a Postgres JSONB table.
#[derive(Debug, Clone)]
pub struct PgTradeStore {
    pool: PgPool,
}

impl PgTradeStore {
    /// Connect, then make sure the `trades` table exists.
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        info!(max_connections, "Connected to Postgres document store");
        Ok(store)
    }

    /// Wrap an existing pool (schema is assumed to exist).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `trades` table if missing.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool, for shutdown.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(id: &str, doc: Value) -> Result<Trade, StorageError> {
    serde_json::from_value(doc).map_err(|e| StorageError::Corrupt {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl TradeRepository for PgTradeStore {
    async fn list(&self) -> Result<Vec<Trade>, StorageError> {
        let rows: Vec<(String, Json<Value>)> =
            sqlx::query_as("SELECT id, doc FROM trades ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, Json(doc))| decode(&id, doc))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Trade>, StorageError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as("SELECT doc FROM trades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(Json(doc),)| decode(id, doc)).transpose()
    }

    #[instrument(skip(self, trade), fields(trade_id = %trade.id))]
    async fn upsert(&self, trade: Trade) -> Result<Trade, StorageError> {
        sqlx::query(
            "INSERT INTO trades (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(&trade.id)
        .bind(Json(&trade))
        .execute(&self.pool)
        .await?;

        Ok(trade)
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM trades WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Postgres
    }

    async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Postgres health check failed");
                false
            }
        }
    }
}
