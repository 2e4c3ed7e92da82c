//! Prometheus Metrics Registry - Journal Observability
//!
//! Holds the service's own registry (no process-global state, so tests
//! can build as many as they like). Covers trade mutations, validation
//! rejections, screenshot cleanup outcomes and the active storage
//! backend. Rendered as text at `GET /metrics`.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use crate::ports::repository::StorageBackend;

/// Centralized Prometheus metrics for the journal service.
///
/// All metrics follow the naming convention `trading_log_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Successful trade mutations by operation (create, update, delete).
    pub trade_mutations: IntCounterVec,
    /// Payloads rejected by validation, by operation.
    pub validation_rejections: IntCounterVec,
    /// Screenshot cleanup results by outcome.
    pub asset_cleanups: IntCounterVec,
    /// Screenshot cleanup duration (seconds).
    pub asset_cleanup_seconds: HistogramVec,
    /// Active storage backend (1 = active).
    pub storage_backend: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trade_mutations = IntCounterVec::new(
            Opts::new(
                "trading_log_trade_mutations_total",
                "Trade records created, updated or deleted",
            ),
            &["operation"],
        )?;

        let validation_rejections = IntCounterVec::new(
            Opts::new(
                "trading_log_validation_rejections_total",
                "Trade payloads rejected by validation",
            ),
            &["operation"],
        )?;

        let asset_cleanups = IntCounterVec::new(
            Opts::new(
                "trading_log_asset_cleanups_total",
                "Screenshot deletions on the media host by outcome",
            ),
            &["outcome"],
        )?;

        let asset_cleanup_seconds = HistogramVec::new(
            HistogramOpts::new(
                "trading_log_asset_cleanup_seconds",
                "Screenshot deletion latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["outcome"],
        )?;

        let storage_backend = IntGaugeVec::new(
            Opts::new(
                "trading_log_storage_backend",
                "Active storage backend (1=active, 0=inactive)",
            ),
            &["backend"],
        )?;

        registry.register(Box::new(trade_mutations.clone()))?;
        registry.register(Box::new(validation_rejections.clone()))?;
        registry.register(Box::new(asset_cleanups.clone()))?;
        registry.register(Box::new(asset_cleanup_seconds.clone()))?;
        registry.register(Box::new(storage_backend.clone()))?;

        Ok(Self {
            registry,
            trade_mutations,
            validation_rejections,
            asset_cleanups,
            asset_cleanup_seconds,
            storage_backend,
        })
    }

    pub fn record_mutation(&self, operation: &str) {
        self.trade_mutations.with_label_values(&[operation]).inc();
    }

    pub fn record_rejection(&self, operation: &str) {
        self.validation_rejections
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_cleanup(&self, outcome: &str, elapsed: Duration) {
        self.asset_cleanups.with_label_values(&[outcome]).inc();
        self.asset_cleanup_seconds
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
    }

    /// Mark `active` as the serving backend and zero the others.
    pub fn set_storage_backend(&self, active: StorageBackend) {
        for backend in [StorageBackend::Memory, StorageBackend::Postgres] {
            self.storage_backend
                .with_label_values(&[backend.as_str()])
                .set(i64::from(backend == active));
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
