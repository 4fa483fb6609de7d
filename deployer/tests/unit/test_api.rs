//! HTTP API tests through the router

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use deployify::app::options::ProviderOptions;
use deployify::app::state::build_gateway;
use deployify::deploy::providers::LocalConfig;
use deployify::deploy::queue::JobQueue;
use deployify::deploy::registry::ProviderRegistry;
use deployify::server::serve::router;
use deployify::server::state::ServerState;
use deployify::store::{DeploymentStore, MemoryStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct TestApi {
    _root: TempDir,
    router: Router,
    jobs: mpsc::Receiver<String>,
}

fn test_api() -> TestApi {
    let root = TempDir::new().unwrap();
    let store: Arc<dyn DeploymentStore> = Arc::new(MemoryStore::new());
    let registry = ProviderRegistry::builtin();
    let (gateway, local) = build_gateway(ProviderOptions {
        local: LocalConfig {
            static_dir: root.path().join("static-hosting"),
            base_url: "http://localhost:8080/static".to_string(),
        },
        ..Default::default()
    });
    let (sender, jobs) = mpsc::channel(8);
    let known = registry.ids().into_iter().map(str::to_string).collect();
    let queue = JobQueue::new(store.clone(), sender, known);

    let state = ServerState::new(store, queue, registry, gateway, local);
    TestApi {
        _root: root,
        router: router(Arc::new(state)),
        jobs,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_create_and_fetch_deployment() {
    let mut api = test_api();

    let (status, body) = send(
        &api.router,
        post_json(
            "/deployments",
            json!({"repoUrl": "https://github.com/x/site", "environment": "school", "budget": "free"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["deploymentId"].as_str().unwrap().to_string();
    assert_eq!(api.jobs.recv().await.unwrap(), id);

    let (status, body) = send(&api.router, get(&format!("/deployments/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["branch"], "main");
    assert_eq!(body["repoUrl"], "https://github.com/x/site");

    let (status, body) = send(&api.router, get(&format!("/deployments/{id}/logs"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejects_invalid_requests() {
    let api = test_api();

    let (status, body) = send(
        &api.router,
        post_json(
            "/deployments",
            json!({"repoUrl": "http://github.com/x/site", "environment": "school", "budget": "free"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(
        &api.router,
        post_json(
            "/deployments",
            json!({"repoUrl": "https://github.com/x/site", "environment": "moon", "budget": "free"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let api = test_api();
    let (_, body) = send(
        &api.router,
        post_json(
            "/deployments",
            json!({"repoUrl": "https://github.com/x/site", "environment": "prod", "budget": "any"}),
        ),
    )
    .await;
    let id = body["deploymentId"].as_str().unwrap().to_string();

    let cancel = || {
        Request::builder()
            .method("POST")
            .uri(format!("/deployments/{id}/cancel"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send(&api.router, cancel()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = send(&api.router, cancel()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_deployment_is_404() {
    let api = test_api();
    let (status, body) = send(&api.router, get("/deployments/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_provider_catalog() {
    let api = test_api();
    let (status, body) = send(&api.router, get("/providers")).await;
    assert_eq!(status, StatusCode::OK);

    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 5);
    assert_eq!(providers[0]["id"], "local");
    assert_eq!(providers[0]["type"], "static");
    assert_eq!(providers[0]["costTier"], "free");
    assert!(providers.iter().all(|p| p["available"] == true));
}

#[tokio::test]
async fn test_health() {
    let api = test_api();
    let (status, body) = send(&api.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "deployify");
}
