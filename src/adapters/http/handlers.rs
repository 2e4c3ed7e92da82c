//! Request handlers. Thin: decode, call the journal, encode.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::adapters::media::UploadSignature;
use crate::domain::trade::Trade;

#[derive(Debug, Deserialize)]
pub struct SignatureQuery {
    folder: Option<String>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "name": "trading-log-api", "status": "ok" }))
}

/// Liveness plus which storage backend is serving.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let repository = state.journal.repository();
    Json(json!({
        "status": "ok",
        "storage": repository.backend().as_str(),
        "storageHealthy": repository.is_healthy().await,
    }))
}

pub async fn list_trades(State(state): State<AppState>) -> Result<Json<Vec<Trade>>, ApiError> {
    Ok(Json(state.journal.list().await?))
}

pub async fn get_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trade>, ApiError> {
    Ok(Json(state.journal.get(&id).await?))
}

pub async fn create_trade(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Trade>), ApiError> {
    let Json(input) = payload?;
    let trade = state.journal.create(&input).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

pub async fn update_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Trade>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.journal.update(&id, &input).await?))
}

pub async fn delete_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.journal.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_signature(
    State(state): State<AppState>,
    query: Result<Query<SignatureQuery>, QueryRejection>,
) -> Result<Json<UploadSignature>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.journal.upload_signature(query.folder.as_deref())?))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
