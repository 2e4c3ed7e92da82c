//! Router assembly and middleware stack.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers;
use crate::config::ServerConfig;

/// Build the full application router.
///
/// # Errors
/// Fails if `cors_origin` is not a valid header value.
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let cors = cors_layer(&config.cors_origin)?;

    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/trades",
            get(handlers::list_trades).post(handlers::create_trade),
        )
        .route("/api/trades/signature", get(handlers::upload_signature))
        .route(
            "/api/trades/:id",
            get(handlers::get_trade)
                .patch(handlers::update_trade)
                .delete(handlers::delete_trade),
        )
        .route("/metrics", get(handlers::metrics))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// `*` allows any origin without credentials; anything else is a single
/// origin with credentials.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    let origin = origin.trim();
    if origin == "*" {
        return Ok(base.allow_origin(Any));
    }

    let value = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid CORS origin: {origin}"))?;
    Ok(base.allow_origin(value).allow_credentials(true))
}
