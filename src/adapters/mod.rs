//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (Postgres, the media host's HTTP API) and
//! exposes the use cases over HTTP.
//!
//! Adapter categories:
//! - `http`: axum router, handlers and error mapping
//! - `media`: Upload signing and signed screenshot deletion
//! - `metrics`: Prometheus registry
//! - `persistence`: In-memory and Postgres trade storage

pub mod http;
pub mod media;
pub mod metrics;
pub mod persistence;
