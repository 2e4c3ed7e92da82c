//! Asset Janitor - Best-Effort Screenshot Cleanup
//!
//! Deletes screenshots that trades no longer reference. Each deletion
//! runs as its own tokio task, bounded by a fixed timeout and detached
//! from the HTTP response. Results are reported on an unbounded channel
//! consumed by [`run_cleanup_log`]; failures are logged and counted,
//! never retried and never surfaced to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::ports::asset_host::{AssetError, AssetHost, DestroyOutcome};

/// Result of one scheduled deletion.
#[derive(Debug)]
pub struct CleanupReport {
  /// Media host public id that was targeted.
  pub public_id: String,
  /// What the media host said (or why it could not be asked).
  pub outcome: Result<DestroyOutcome, AssetError>,
  /// Wall time spent on the call.
  pub elapsed: Duration,
}

impl CleanupReport {
  /// Stable label for logs and metrics.
  pub fn outcome_label(&self) -> &'static str {
    match &self.outcome {
      Ok(DestroyOutcome::Deleted) => "deleted",
      Ok(DestroyOutcome::AlreadyGone) => "already_gone",
      Err(AssetError::NotConfigured) => "not_configured",
      Err(AssetError::TimedOut(_)) => "timed_out",
      Err(_) => "failed",
    }
  }
}

/// Schedules detached screenshot deletions.
#[derive(Clone)]
pub struct AssetJanitor {
  /// Media host port.
  host: Arc<dyn AssetHost>,
  /// Upper bound for a single deletion.
  timeout: Duration,
  /// Report channel.
  reports: mpsc::UnboundedSender<CleanupReport>,
}

impl AssetJanitor {
  /// Create a janitor and the receiving end of its report channel.
  pub fn new(
    host: Arc<dyn AssetHost>,
    timeout: Duration,
  ) -> (Self, mpsc::UnboundedReceiver<CleanupReport>) {
    let (reports, rx) = mpsc::unbounded_channel();
    (
      Self {
        host,
        timeout,
        reports,
      },
      rx,
    )
  }

  /// Delete `public_id` in the background.
  ///
  /// Must be called from within a tokio runtime. The returned handle can
  /// be awaited but never has to be.
  #[instrument(skip(self))]
  pub fn schedule(&self, public_id: String) -> JoinHandle<()> {
    let host = Arc::clone(&self.host);
    let timeout = self.timeout;
    let reports = self.reports.clone();

    tokio::spawn(async move {
      let started = Instant::now();
      let outcome = match tokio::time::timeout(timeout, host.destroy(&public_id)).await {
        Ok(result) => result,
        Err(_) => Err(AssetError::TimedOut(timeout)),
      };

      let report = CleanupReport {
        public_id,
        outcome,
        elapsed: started.elapsed(),
      };
      if let Err(mpsc::error::SendError(report)) = reports.send(report) {
        warn!(
          public_id = %report.public_id,
          outcome = report.outcome_label(),
          "Cleanup report dropped, no listener"
        );
      }
    })
  }
}

/// Consume cleanup reports until every janitor handle is dropped.
pub async fn run_cleanup_log(
  mut rx: mpsc::UnboundedReceiver<CleanupReport>,
  metrics: Arc<MetricsRegistry>,
) {
  while let Some(report) = rx.recv().await {
    let label = report.outcome_label();
    metrics.record_cleanup(label, report.elapsed);

    match &report.outcome {
      Ok(_) => info!(
        public_id = %report.public_id,
        outcome = label,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Orphaned screenshot cleaned up"
      ),
      Err(e) => warn!(
        public_id = %report.public_id,
        outcome = label,
        error = %e,
        "Screenshot cleanup failed"
      ),
    }
  }
  info!("Cleanup report channel closed");
}
