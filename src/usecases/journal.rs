//! Trade Journal - Trade Record Lifecycle
//!
//! Orchestrates validation, persistence and screenshot cleanup for the
//! journal's CRUD operations, and issues upload signatures for the UI.
//!
//! Ordering guarantees:
//! - update: existence check, then validation, then persist, then cleanup
//! - delete: remove the record first, then schedule cleanup
//!
//! Cleanup never affects the result returned to the caller.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::asset_janitor::AssetJanitor;
use crate::adapters::media::{MediaSigner, UploadSignature};
use crate::adapters::media::signer::unix_timestamp;
use crate::adapters::metrics::MetricsRegistry;
use crate::config::AppConfig;
use crate::domain::assets::{incoming_reference, plan_cleanup, reference_of};
use crate::domain::trade::Trade;
use crate::domain::validation::{ValidationError, ValidationRules, validate_create, validate_update};
use crate::ports::repository::{SharedRepository, StorageError};

/// Journal operation failure.
#[derive(Debug, Error)]
pub enum JournalError {
  /// No trade with the requested id.
  #[error("Trade not found")]
  NotFound,
  /// The payload was rejected.
  #[error(transparent)]
  Validation(#[from] ValidationError),
  /// The storage backend failed.
  #[error(transparent)]
  Storage(#[from] StorageError),
  /// Upload signatures were requested without media credentials.
  #[error("Image host is not configured")]
  MediaNotConfigured,
}

/// Trade journal use case.
pub struct TradeJournal {
  /// Storage port.
  repository: SharedRepository,
  /// Orphaned screenshot cleanup.
  janitor: AssetJanitor,
  /// Upload signer; `None` when media credentials are missing.
  signer: Option<MediaSigner>,
  rules: ValidationRules,
  /// Folder used when the client does not ask for one.
  default_folder: String,
  metrics: Arc<MetricsRegistry>,
}

impl TradeJournal {
  /// Create a new journal.
  pub fn new(
    repository: SharedRepository,
    janitor: AssetJanitor,
    signer: Option<MediaSigner>,
    metrics: Arc<MetricsRegistry>,
    config: &AppConfig,
  ) -> Self {
    Self {
      repository,
      janitor,
      signer,
      rules: config.validation.rules(),
      default_folder: config.media.default_folder.clone(),
      metrics,
    }
  }

  /// The storage port, for health reporting.
  pub fn repository(&self) -> &SharedRepository {
    &self.repository
  }

  /// All trades.
  pub async fn list(&self) -> Result<Vec<Trade>, JournalError> {
    Ok(self.repository.list().await?)
  }

  /// One trade by id.
  pub async fn get(&self, id: &str) -> Result<Trade, JournalError> {
    self.repository.get(id).await?.ok_or(JournalError::NotFound)
  }

  /// Validate and store a new trade with a fresh id.
  #[instrument(skip(self, input))]
  pub async fn create(&self, input: &Value) -> Result<Trade, JournalError> {
    let new_trade = validate_create(input, &self.rules).inspect_err(|e| {
      self.metrics.record_rejection("create");
      debug!(error = %e, "Create payload rejected");
    })?;

    let trade = new_trade.into_trade(Uuid::new_v4().to_string(), Utc::now());
    let stored = self.repository.upsert(trade).await?;

    self.metrics.record_mutation("create");
    info!(trade_id = %stored.id, "Trade created");
    Ok(stored)
  }

  /// Merge a partial update into an existing trade.
  ///
  /// When the screenshot changes, the previous asset is deleted in the
  /// background after the merged record has been stored.
  #[instrument(skip(self, input))]
  pub async fn update(&self, id: &str, input: &Value) -> Result<Trade, JournalError> {
    let existing = self.get(id).await?;

    let patch = validate_update(input, &self.rules).inspect_err(|e| {
      self.metrics.record_rejection("update");
      debug!(error = %e, "Update payload rejected");
    })?;

    let incoming = incoming_reference(&patch);
    let merged = patch.apply(&existing, Utc::now());
    let stored = self.repository.upsert(merged).await?;

    self.metrics.record_mutation("update");
    info!(trade_id = %stored.id, "Trade updated");

    if let Some(orphan) = plan_cleanup(reference_of(&existing).as_deref(), &incoming) {
      info!(trade_id = %stored.id, public_id = %orphan, "Scheduling replaced screenshot cleanup");
      self.janitor.schedule(orphan);
    }

    Ok(stored)
  }

  /// Delete a trade and, in the background, its screenshot.
  #[instrument(skip(self))]
  pub async fn delete(&self, id: &str) -> Result<(), JournalError> {
    let existing = self.get(id).await?;
    if !self.repository.remove(id).await? {
      return Err(JournalError::NotFound);
    }

    self.metrics.record_mutation("delete");
    info!(trade_id = %id, "Trade deleted");

    if let Some(orphan) = reference_of(&existing) {
      info!(trade_id = %id, public_id = %orphan, "Scheduling screenshot cleanup");
      self.janitor.schedule(orphan);
    }

    Ok(())
  }

  /// Issue a direct-upload signature for `folder` (default folder if
  /// `None` or empty).
  pub fn upload_signature(&self, folder: Option<&str>) -> Result<UploadSignature, JournalError> {
    let signer = self.signer.as_ref().ok_or(JournalError::MediaNotConfigured)?;

    let folder = folder
      .map(str::trim)
      .filter(|f| !f.is_empty())
      .unwrap_or(&self.default_folder);

    if !is_valid_folder(folder) {
      let mut error = ValidationError::default();
      error.push_field("folder", "Invalid folder");
      return Err(error.into());
    }

    Ok(signer.upload_signature(folder, unix_timestamp()))
  }
}

fn is_valid_folder(folder: &str) -> bool {
  folder
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'))
}
