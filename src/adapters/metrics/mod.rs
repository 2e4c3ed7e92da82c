//! Metrics Adapter
//!
//! Prometheus registry for the journal, exported through the HTTP
//! adapter's `/metrics` route.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
