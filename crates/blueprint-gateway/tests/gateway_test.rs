//! Integration Test: HTTP Gateway
//!
//! Exercises the router in-process with a scripted completion provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use blueprint_agent::{CompletionOptions, CompletionProvider};
use blueprint_gateway::{Gateway, GatewayConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOOK_INTENT: &str = r#"{"projectType": "api", "database": "mongodb",
 "entities": [{"name": "Book", "fields": [{"name": "title", "type": "string"}, {"name": "author", "type": "string"}]}]}"#;

enum Script {
    Reply(String),
    Fail,
    Hang,
}

struct ScriptedProvider(Script);

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> anyhow::Result<String> {
        match &self.0 {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail => anyhow::bail!("upstream returned 502"),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
        }
    }
}

async fn test_router(dir: &TempDir, script: Script) -> Router {
    let mut config = GatewayConfig::default().with_output_dir(dir.path());
    config.provider.timeout_secs = 1;
    let gateway = Gateway::with_provider(config, Arc::new(ScriptedProvider(script)));
    gateway.prepare_output().await.unwrap();
    gateway.build_router()
}

fn generate_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let router = test_router(&dir, Script::Fail).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], blueprint_gateway::VERSION);
}

#[tokio::test]
async fn test_generate_and_download() {
    let dir = TempDir::new().unwrap();
    let router = test_router(&dir, Script::Reply(BOOK_INTENT.to_string())).await;

    let (status, body) = send_json(
        &router,
        generate_request(json!({"description": "A simple book API", "projectName": "books"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["project"], "books");
    assert_eq!(body["files"].as_array().unwrap().len(), 5);
    assert_eq!(body["archive"]["name"], "books.tar.gz");
    assert_eq!(body["archive"]["downloadLocator"], "/downloads/books.tar.gz");

    let download = Request::builder()
        .uri("/downloads/books.tar.gz")
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = send(&router, download).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bytes,
        std::fs::read(dir.path().join("archives/books.tar.gz")).unwrap()
    );
}

#[tokio::test]
async fn test_missing_archive_is_not_found() {
    let dir = TempDir::new().unwrap();
    let router = test_router(&dir, Script::Fail).await;

    let request = Request::builder()
        .uri("/downloads/nothing.tar.gz")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_requests() {
    let dir = TempDir::new().unwrap();
    let router = test_router(&dir, Script::Reply(BOOK_INTENT.to_string())).await;

    let (status, body) = send_json(&router, generate_request(json!({"description": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "invalid_request");
    assert_eq!(body["error"]["retryable"], false);

    let (status, body) = send_json(&router, generate_request(json!({"projectName": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let not_json = Request::builder()
        .method(Method::POST)
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("description=books"))
        .unwrap();
    let (status, _) = send_json(&router, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_database_is_unprocessable() {
    let dir = TempDir::new().unwrap();
    let router = test_router(&dir, Script::Reply(BOOK_INTENT.replace("mongodb", "postgres"))).await;

    let (status, body) = send_json(&router, generate_request(json!({"description": "A book API"}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "unsupported_feature");
    assert!(body["error"]["message"].as_str().unwrap().contains("postgres"));
    assert_eq!(std::fs::read_dir(dir.path().join("projects")).unwrap().count(), 0);
}

#[tokio::test]
async fn test_provider_failures_are_retryable() {
    let dir = TempDir::new().unwrap();

    let router = test_router(&dir, Script::Fail).await;
    let (status, body) = send_json(&router, generate_request(json!({"description": "A book API"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "provider_unavailable");
    assert_eq!(body["error"]["retryable"], true);

    let router = test_router(&dir, Script::Hang).await;
    let (status, body) = send_json(&router, generate_request(json!({"description": "A book API"}))).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["kind"], "provider_timeout");
    assert_eq!(body["error"]["retryable"], true);
}
