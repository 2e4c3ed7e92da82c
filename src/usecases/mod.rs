//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! journal's workflows.
//!
//! Use cases:
//! - `TradeJournal`: Trade CRUD and upload signatures
//! - `AssetJanitor`: Detached cleanup of orphaned screenshots

pub mod asset_janitor;
pub mod journal;

pub use asset_janitor::{AssetJanitor, CleanupReport, run_cleanup_log};
pub use journal::{JournalError, TradeJournal};
