//! Trading Log API - Entry Point
//!
//! Initializes configuration, logging, storage and the media host
//! client, then serves the journal over HTTP until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load `.env`, then config.toml + env overrides, validate
//! 2. Init tracing (JSON structured logging by default)
//! 3. Select the storage backend (Postgres or in-memory fallback)
//! 4. Create the metrics registry
//! 5. Create the media signer/host and spawn the cleanup report logger
//! 6. Build the journal and the axum router
//! 7. Serve until a shutdown signal, drain with a cutoff, close the pool

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use trading_log_api::adapters::http::{AppState, router};
use trading_log_api::adapters::media::build_media;
use trading_log_api::adapters::metrics::MetricsRegistry;
use trading_log_api::adapters::persistence::connect_repository;
use trading_log_api::config::{self, ServerConfig};
use trading_log_api::usecases::{AssetJanitor, TradeJournal, run_cleanup_log};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let env_file = dotenvy::dotenv().ok();
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config.server);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %config_path,
        env_file = ?env_file,
        bind = %config.server.bind_address(),
        "Starting trading-log-api"
    );

    // ── 3. Storage backend (decided once) ───────────────────
    let storage = connect_repository(&config.persistence)
        .await
        .context("Failed to initialize storage")?;
    info!(backend = %storage.backend(), "Storage ready");

    // ── 4. Metrics ──────────────────────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    metrics.set_storage_backend(storage.backend());

    // ── 5. Media host + cleanup reporting ───────────────────
    let (signer, asset_host) = build_media(&config.media)?;
    if signer.is_none() {
        warn!("Media host credentials missing; upload signatures disabled");
    }
    let (janitor, reports) = AssetJanitor::new(asset_host, config.media.request_timeout());
    let cleanup_log = tokio::spawn(run_cleanup_log(reports, Arc::clone(&metrics)));

    // ── 6. Journal + router ─────────────────────────────────
    let journal = Arc::new(TradeJournal::new(
        Arc::clone(&storage.repository),
        janitor,
        signer,
        Arc::clone(&metrics),
        &config,
    ));
    let app = router(AppState { journal, metrics }, &config.server)?;

    // ── 7. Serve ────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    info!(address = %config.server.bind_address(), "HTTP server listening");

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
    });

    tokio::select! {
        () = shutdown_signal() => {}
        result = &mut server => {
            storage.close().await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e).context("HTTP server failed"),
                Err(e) => Err(e).context("HTTP server task panicked"),
            };
        }
    }

    // ── Graceful shutdown: stop accepting, drain, close ─────
    let _ = shutdown_tx.send(());
    let cutoff = config.server.shutdown_timeout();
    match tokio::time::timeout(cutoff, &mut server).await {
        Ok(Ok(Ok(()))) => info!("HTTP server drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server failed during shutdown"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task panicked"),
        Err(_) => {
            warn!(
                cutoff_secs = cutoff.as_secs(),
                "Drain cutoff reached, dropping open connections"
            );
            server.abort();
        }
    }

    // In-flight cleanups get a short grace period to report.
    if tokio::time::timeout(std::time::Duration::from_secs(2), cleanup_log)
        .await
        .is_err()
    {
        warn!("Cleanup reports still pending at exit");
    }

    storage.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `server.log_level`.
fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server.log_level));

    if server.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Resolve on SIGINT or (on unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received, initiating graceful shutdown"),
        () = terminate => info!("SIGTERM received, initiating graceful shutdown"),
    }
}
