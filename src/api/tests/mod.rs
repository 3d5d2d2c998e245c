use super::*;
use crate::api::auth::Claims;
use crate::error::ApiError;
use crate::search::{LogSearch, SearchResponse};
use crate::test_helpers::{ScriptedSearch, TEST_SECRET, page, test_config, wait_for_outcome};
use crate::types::{DownloadLogResponse, DownloadState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::time::Duration;
use tower::ServiceExt; // for oneshot


/// Manager over a scripted search, plus the tempdir it writes to (must be kept alive)
async fn create_test_manager(
    script: Vec<std::result::Result<SearchResponse, crate::error::SearchError>>,
) -> (Arc<LogDownloadManager>, tempfile::TempDir) {
    create_test_manager_with(Arc::new(ScriptedSearch::new(script)), |_| {}).await
}

async fn create_test_manager_with(
    search: Arc<dyn LogSearch>,
    tweak: impl FnOnce(&mut Config),
) -> (Arc<LogDownloadManager>, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    tweak(&mut config);

    let manager = LogDownloadManager::new(config, search).await.unwrap();
    (Arc::new(manager), temp_dir)
}

fn router_for(manager: &Arc<LogDownloadManager>) -> Router {
    create_router(manager.clone(), manager.config.clone())
}

/// Token for `organization_id` granting `access`
fn token_for(organization_id: &str, access: &[&str]) -> String {
    let claims = Claims {
        user_id: "user-1".into(),
        access: access.iter().map(|a| a.to_string()).collect(),
        role: "Owner".into(),
        organization_id: organization_id.into(),
        exp: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit an export for `org-1` through the API and return the queued entry
async fn submit(app: &Router, body: serde_json::Value) -> DownloadLogResponse {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/logs")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await
}

#[tokio::test]
async fn test_api_server_spawns_and_stops_on_shutdown() {
    let (manager, _temp_dir) = create_test_manager_with(
        Arc::new(ScriptedSearch::new(vec![])),
        |config| config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(),
    )
    .await;

    let api_handle = manager.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    manager.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("API server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (manager, _temp_dir) = create_test_manager(vec![]).await;
    let app = router_for(&manager);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (manager, _temp_dir) = create_test_manager_with(
        Arc::new(ScriptedSearch::new(vec![])),
        |config| config.server.api.cors_enabled = false,
    )
    .await;
    let app = router_for(&manager);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn test_build_cors_layer_accepts_specific_origins() {
    // Invalid header values are skipped rather than failing
    let _layer = build_cors_layer(&[
        "http://localhost:3000".to_string(),
        "bad\norigin".to_string(),
    ]);
}
