//! API Tests - End-to-end Journal Behaviour over HTTP
//!
//! Drives the full axum router with `tower::ServiceExt::oneshot` on top
//! of the in-memory store. The media host is a mockall mock; cleanup
//! outcomes are observed on the janitor's report channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use mockall::mock;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use trading_log_api::adapters::http::{AppState, router};
use trading_log_api::adapters::media::MediaSigner;
use trading_log_api::adapters::metrics::MetricsRegistry;
use trading_log_api::adapters::persistence::InMemoryTradeStore;
use trading_log_api::config::{AppConfig, MediaCredentials};
use trading_log_api::domain::trade::Trade;
use trading_log_api::ports::asset_host::{AssetError, AssetHost, DestroyOutcome};
use trading_log_api::ports::repository::{
    SharedRepository, StorageBackend, StorageError, TradeRepository,
};
use trading_log_api::usecases::{AssetJanitor, CleanupReport, TradeJournal};

// ---- Mock Definitions ----

mock! {
    pub Host {}

    #[async_trait::async_trait]
    impl AssetHost for Host {
        async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, AssetError>;
    }
}

/// A document store that refuses every call.
struct UnreachableStore;

const STORE_FAILURE: &str = "connection refused by 10.0.0.5:5432 (user=journal)";

#[async_trait]
impl TradeRepository for UnreachableStore {
    async fn list(&self) -> Result<Vec<Trade>, StorageError> {
        Err(StorageError::Backend(STORE_FAILURE.to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Option<Trade>, StorageError> {
        Err(StorageError::Backend(STORE_FAILURE.to_string()))
    }

    async fn upsert(&self, _trade: Trade) -> Result<Trade, StorageError> {
        Err(StorageError::Backend(STORE_FAILURE.to_string()))
    }

    async fn remove(&self, _id: &str) -> Result<bool, StorageError> {
        Err(StorageError::Backend(STORE_FAILURE.to_string()))
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Postgres
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

// ---- Helpers ----

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    reports: mpsc::UnboundedReceiver<CleanupReport>,
}

fn app_with(host: MockHost, signed: bool) -> TestApp {
    app_on(Arc::new(InMemoryTradeStore::new()), host, signed)
}

fn app_on(repository: SharedRepository, host: MockHost, signed: bool) -> TestApp {
    let config = AppConfig::default();
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let (janitor, reports) = AssetJanitor::new(Arc::new(host), Duration::from_secs(2));
    let signer = signed.then(|| {
        MediaSigner::new(MediaCredentials {
            cloud_name: "demo".to_string(),
            api_key: "123456".to_string(),
            api_secret: SECRET.to_string(),
        })
    });
    let journal = Arc::new(TradeJournal::new(
        repository,
        janitor,
        signer,
        Arc::clone(&metrics),
        &config,
    ));
    let router = router(AppState { journal, metrics }, &config.server).unwrap();
    TestApp { router, reports }
}

fn app() -> TestApp {
    app_with(MockHost::new(), true)
}

fn payload() -> Value {
    json!({
        "date": "2024-03-01T09:30",
        "session": "לונדון",
        "pair": "EUR-USD",
        "trendMain": "מגמת עליות",
        "trendSecondary": "מגמת עליות",
        "tfBlock": "4H",
        "tfEntry": "5m",
        "tradeType": "לונג 🟢",
        "rr": "1:2",
        "result": "TP ✅"
    })
}

fn screenshot(public_id: &str) -> String {
    format!("https://res.cloudinary.com/demo/image/upload/v1712345678/{public_id}.png")
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create(router: &Router, body: Value) -> Value {
    let (status, created) = send(router, "POST", "/api/trades", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    created
}

// ---- Trade CRUD ----

#[tokio::test]
async fn test_create_then_get_returns_submitted_fields() {
    let app = app();
    let created = create(&app.router, payload()).await;
    let id = created["id"].as_str().unwrap();

    let (status, fetched) = send(&app.router, "GET", &format!("/api/trades/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    for (key, value) in payload().as_object().unwrap() {
        assert_eq!(&fetched[key], value, "field {key} differs");
    }
    assert!(fetched["createdAt"].is_string());
}

#[tokio::test]
async fn test_list_returns_created_trades() {
    let app = app();
    create(&app.router, payload()).await;
    create(&app.router, payload()).await;

    let (status, list) = send(&app.router, "GET", "/api/trades", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_patch_is_rejected() {
    let app = app();
    let created = create(&app.router, payload()).await;
    let id = created["id"].as_str().unwrap();

    let uri = format!("/api/trades/{id}");
    let (status, body) = send(&app.router, "PATCH", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation Error");
    assert_eq!(
        body["details"]["formErrors"][0],
        "At least one field must be provided for update"
    );
}

#[tokio::test]
async fn test_patch_merges_into_existing_record() {
    let app = app();
    let created = create(&app.router, payload()).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send(
        &app.router,
        "PATCH",
        &format!("/api/trades/{id}"),
        Some(json!({ "notes": "waited for the retest" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rr"], "1:2");
    assert_eq!(updated["notes"], "waited for the retest");
    assert_eq!(updated["id"], created["id"]);
    assert!(updated["updatedAt"].is_string());
}

#[tokio::test]
async fn test_patch_unknown_trade_is_not_found() {
    let app = app();
    let patch = Some(json!({ "rr": "2" }));
    let (status, body) = send(&app.router, "PATCH", "/api/trades/nope", patch).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Trade not found");
}

#[tokio::test]
async fn test_delete_twice_is_no_content_then_not_found() {
    let app = app();
    let created = create(&app.router, payload()).await;
    let uri = format!("/api/trades/{}", created["id"].as_str().unwrap());

    let (first, body) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(first, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (second, _) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(second, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_is_a_field_error() {
    let app = app();
    let mut body = payload();
    body["session"] = json!("Tokyo");

    let (status, response) = send(&app.router, "POST", "/api/trades", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Validation Error");
    assert!(response["details"]["fieldErrors"]["session"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/trades")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"date\": "))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_rejected_with_json_message() {
    let app = app();
    let limit = AppConfig::default().server.body_limit_bytes;
    let mut body = payload();
    body["notes"] = json!("x".repeat(limit + 1));

    let (status, response) = send(&app.router, "POST", "/api/trades", Some(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response, json!({ "message": "Request body too large" }));

    let (_, list) = send(&app.router, "GET", "/api/trades", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_storage_failure_returns_generic_body() {
    let app = app_on(Arc::new(UnreachableStore), MockHost::new(), true);

    let (status, body) = send(&app.router, "GET", "/api/trades", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal Server Error" }));
    assert!(!body.to_string().contains("10.0.0.5"));

    let (status, body) = send(&app.router, "POST", "/api/trades", Some(payload())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal Server Error" }));

    let (status, health) = send(&app.router, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["storage"], "postgres");
    assert_eq!(health["storageHealthy"], false);
}

// ---- Screenshot cleanup ----

#[tokio::test]
async fn test_replaced_screenshot_is_deleted_once_even_if_host_fails() {
    let mut host = MockHost::new();
    host.expect_destroy()
        .withf(|public_id: &str| public_id == "trades/a1")
        .times(1)
        .returning(|_| Err(AssetError::Transport("connection reset".to_string())));
    let mut app = app_with(host, true);

    let mut body = payload();
    body["screenshotUrl"] = json!(screenshot("trades/a1"));
    let created = create(&app.router, body).await;
    assert_eq!(created["screenshotId"], "trades/a1");

    let (status, updated) = send(
        &app.router,
        "PATCH",
        &format!("/api/trades/{}", created["id"].as_str().unwrap()),
        Some(json!({ "screenshotUrl": screenshot("trades/b2") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["screenshotId"], "trades/b2");

    let report = app.reports.recv().await.unwrap();
    assert_eq!(report.public_id, "trades/a1");
    assert_eq!(report.outcome_label(), "failed");
    assert!(app.reports.try_recv().is_err());
}

#[tokio::test]
async fn test_deleting_trade_deletes_its_screenshot() {
    let mut host = MockHost::new();
    host.expect_destroy()
        .withf(|public_id: &str| public_id == "trades/a1")
        .times(1)
        .returning(|_| Ok(DestroyOutcome::Deleted));
    let mut app = app_with(host, true);

    let mut body = payload();
    body["screenshotUrl"] = json!(screenshot("trades/a1"));
    let created = create(&app.router, body).await;

    let uri = format!("/api/trades/{}", created["id"].as_str().unwrap());
    let (status, _) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let report = app.reports.recv().await.unwrap();
    assert_eq!(report.public_id, "trades/a1");
    assert_eq!(report.outcome_label(), "deleted");
}

#[tokio::test]
async fn test_clearing_screenshot_deletes_old_asset() {
    let mut host = MockHost::new();
    host.expect_destroy()
        .times(1)
        .returning(|_| Ok(DestroyOutcome::AlreadyGone));
    let mut app = app_with(host, true);

    let mut body = payload();
    body["screenshotUrl"] = json!(screenshot("trades/a1"));
    let created = create(&app.router, body).await;

    let (status, updated) = send(
        &app.router,
        "PATCH",
        &format!("/api/trades/{}", created["id"].as_str().unwrap()),
        Some(json!({ "screenshotUrl": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated.get("screenshotUrl").is_none());
    assert!(updated.get("screenshotId").is_none());
    assert_eq!(app.reports.recv().await.unwrap().public_id, "trades/a1");
}

// ---- Upload signatures ----

#[tokio::test]
async fn test_signature_is_recomputable_from_folder_timestamp_and_secret() {
    let app = app();
    let (status, sig) = send(&app.router, "GET", "/api/trades/signature?folder=charts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sig["folder"], "charts");
    assert_eq!(sig["cloudName"], "demo");
    assert_eq!(sig["apiKey"], "123456");

    let timestamp = sig["timestamp"].as_i64().unwrap();
    let expected = hex::encode(hmac_sha256::Hash::hash(
        format!("folder=charts&timestamp={timestamp}{SECRET}").as_bytes(),
    ));
    assert_eq!(sig["signature"], expected);
}

#[tokio::test]
async fn test_signature_defaults_to_trades_folder() {
    let app = app();
    let (status, sig) = send(&app.router, "GET", "/api/trades/signature", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sig["folder"], "trades");
}

#[tokio::test]
async fn test_signature_without_credentials_is_unavailable() {
    let app = app_with(MockHost::new(), false);
    let (status, body) = send(&app.router, "GET", "/api/trades/signature", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Image host is not configured");
}

#[tokio::test]
async fn test_signature_rejects_malformed_query_with_json_message() {
    let app = app();
    let request = Request::builder()
        .uri("/api/trades/signature?folder=a&folder=b")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("folder"));
}

// ---- Service surface ----

#[tokio::test]
async fn test_root_and_health() {
    let app = app();
    let (status, root) = send(&app.router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root, json!({ "name": "trading-log-api", "status": "ok" }));

    let (status, health) = send(&app.router, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["storage"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = app();
    let (status, body) = send(&app.router, "GET", "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Not Found" }));
}

#[tokio::test]
async fn test_unsupported_method_is_json_method_not_allowed() {
    let app = app();
    let request = Request::builder()
        .method("PUT")
        .uri("/api/trades/abc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response.headers()[header::ALLOW].to_str().unwrap().to_string();
    assert!(allow.contains("PATCH") && allow.contains("DELETE"), "allow: {allow}");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "message": "Method Not Allowed" }));

    let (status, body) = send(&app.router, "DELETE", "/api/trades", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "Method Not Allowed");
}

#[tokio::test]
async fn test_responses_are_gzip_encoded_when_accepted() {
    let app = app();
    create(&app.router, payload()).await;

    let list = |encoding: Option<&str>| {
        let mut builder = Request::builder().uri("/api/trades");
        if let Some(encoding) = encoding {
            builder = builder.header(header::ACCEPT_ENCODING, encoding);
        }
        app.router.clone().oneshot(builder.body(Body::empty()).unwrap())
    };

    let compressed = list(Some("gzip")).await.unwrap();
    assert_eq!(compressed.status(), StatusCode::OK);
    assert_eq!(compressed.headers()[header::CONTENT_ENCODING], "gzip");

    let plain = list(None).await.unwrap();
    assert!(plain.headers().get(header::CONTENT_ENCODING).is_none());
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_metrics_count_mutations() {
    let app = app();
    create(&app.router, payload()).await;

    let (status, text) = send(&app.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        text.as_str()
            .unwrap()
            .contains("trading_log_trade_mutations_total{operation=\"create\"} 1")
    );
}
