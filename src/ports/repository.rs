//! Repository Port - Trade Persistence Interface
//!
//! The use-case layer only knows this trait. Two adapters implement it:
//! an in-memory table and a Postgres-backed document store. Which one is
//! used is decided once at startup and injected.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::trade::Trade;

/// Which storage adapter is serving a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  /// Process-local table; lost on restart.
  Memory,
  /// Persistent document store.
  Postgres,
}

impl StorageBackend {
  /// Stable label for logs, metrics and the health endpoint.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Memory => "memory",
      Self::Postgres => "postgres",
    }
  }
}

impl std::fmt::Display for StorageBackend {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Backend failure (unreachable store, failed write, corrupt document).
///
/// Never retried by the repository.
#[derive(Debug, Error)]
pub enum StorageError {
  /// The backend could not be reached or rejected the operation.
  #[error("storage backend error: {0}")]
  Backend(String),
  /// A stored document could not be decoded into a `Trade`.
  #[error("corrupt trade document {id}: {reason}")]
  Corrupt { id: String, reason: String },
}

/// Trait for trade storage providers.
///
/// Semantics are identical across backends:
/// - `get` signals absence with `None`, never with an error
/// - `upsert` inserts or replaces the whole record keyed by `trade.id`
/// - `remove` reports whether a record was actually deleted
#[async_trait]
pub trait TradeRepository: Send + Sync + 'static {
  /// All records. Insertion order for memory, creation order otherwise.
  async fn list(&self) -> Result<Vec<Trade>, StorageError>;

  /// The record for `id`, if any.
  async fn get(&self, id: &str) -> Result<Option<Trade>, StorageError>;

  /// Insert or replace; returns the stored record.
  async fn upsert(&self, trade: Trade) -> Result<Trade, StorageError>;

  /// Delete by id; `true` only if something was deleted.
  async fn remove(&self, id: &str) -> Result<bool, StorageError>;

  /// The adapter behind this repository.
  fn backend(&self) -> StorageBackend;

  /// Check if the backend is currently reachable.
  async fn is_healthy(&self) -> bool;
}

/// Repository handle shared across request handlers.
pub type SharedRepository = Arc<dyn TradeRepository>;
