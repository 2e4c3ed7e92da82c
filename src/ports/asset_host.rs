//! Asset Host Port - External Screenshot Storage
//!
//! The journal never uploads images itself: the UI uploads directly to
//! the media host using a signature issued by this service. The only
//! server-side call is deleting an asset that a trade no longer
//! references.

use async_trait::async_trait;
use thiserror::Error;

/// Successful outcome of a deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
  /// The asset existed and was deleted.
  Deleted,
  /// The host had no asset under that id.
  AlreadyGone,
}

/// Failed deletion. Only ever logged, never surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AssetError {
  /// No credentials configured for the media host.
  #[error("media host is not configured")]
  NotConfigured,
  /// Transport failure (DNS, TLS, connection reset, timeout).
  #[error("media host request failed: {0}")]
  Transport(String),
  /// The host answered with a non-success status.
  #[error("media host returned {status}: {body}")]
  Rejected { status: u16, body: String },
  /// The host answered 2xx with an unexpected result.
  #[error("unexpected media host result: {0}")]
  UnexpectedResult(String),
  /// The call did not finish within the cleanup deadline.
  #[error("media host call timed out after {0:?}")]
  TimedOut(std::time::Duration),
}

/// Trait for media hosts that can delete assets by public id.
#[async_trait]
pub trait AssetHost: Send + Sync + 'static {
  /// Delete the asset addressed by `public_id`.
  async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, AssetError>;
}
