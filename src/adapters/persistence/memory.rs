//! In-Memory Trade Store - Process-Local Fallback Backend
//!
//! Keeps trades in an insertion-ordered map behind a read/write lock.
//! Used when no document store is configured or reachable. Each
//! instance owns its own table, so tests never share state.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::domain::trade::{Trade, TradeId};
use crate::ports::repository::{StorageBackend, StorageError, TradeRepository};

/// Insertion-ordered in-memory trade table.
///
/// Replacing an existing id keeps its original position; removal
/// preserves the order of the remaining records.
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    /// Trades keyed by id.
    trades: RwLock<IndexMap<TradeId, Trade>>,
}

impl InMemoryTradeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored trades.
    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }
}

#[async_trait]
impl TradeRepository for InMemoryTradeStore {
    async fn list(&self) -> Result<Vec<Trade>, StorageError> {
        Ok(self.trades.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Trade>, StorageError> {
        Ok(self.trades.read().get(id).cloned())
    }

    #[instrument(skip(self, trade), fields(trade_id = %trade.id))]
    async fn upsert(&self, trade: Trade) -> Result<Trade, StorageError> {
        let replaced = self
            .trades
            .write()
            .insert(trade.id.clone(), trade.clone())
            .is_some();
        debug!(replaced, "Trade stored in memory");
        Ok(trade)
    }

    async fn remove(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.trades.write().shift_remove(id).is_some())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
