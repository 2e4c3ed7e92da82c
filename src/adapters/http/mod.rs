//! HTTP Adapter - REST Surface of the Journal
//!
//! axum 0.7 router exposing trade CRUD, upload signatures, health and
//! Prometheus metrics, with CORS, request tracing, a body size limit
//! and security headers applied to every response.

pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

pub use error::ApiError;
pub use routes::router;

use crate::adapters::metrics::MetricsRegistry;
use crate::usecases::journal::TradeJournal;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub journal: Arc<TradeJournal>,
    pub metrics: Arc<MetricsRegistry>,
}
