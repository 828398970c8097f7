#![cfg(feature = "server")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Json;
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use flightcast::advisory::{
    AdvisoryBoundary, AdvisoryOrchestrator, AdvisoryRequest, CascadeResolver, HttpBoundary,
    PROVIDER_ERROR, PROVIDER_STUB, PROVIDER_STUB_FALLBACK,
};
use flightcast::config::RemoteConfig;
use flightcast::error::BoundaryError;
use flightcast::gateway::AdvisoryGateway;

const API_KEY: &str = "test-key-123";

/// How the fake generation service answers.
#[derive(Clone, Copy)]
enum Upstream {
    /// 404 for every model except the given path suffix
    OnlyServes(&'static str),
    /// 503 for everything
    Overloaded,
    /// 400 echoing the key back in the message
    EchoesKey,
}

struct FakeGemini {
    behaviour: Upstream,
    paths: Mutex<Vec<String>>,
    keys: Mutex<Vec<String>>,
}

async fn fake_gemini_handler(
    State(fake): State<Arc<FakeGemini>>,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    fake.paths.lock().unwrap().push(uri.path().to_string());
    if let Some(key) = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) {
        fake.keys.lock().unwrap().push(key.to_string());
    }

    match fake.behaviour {
        Upstream::OnlyServes(suffix) if uri.path().ends_with(suffix) => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{"content": {"parts": [{"text": "Leave early; "}, {"text": "storms at JFK."}]}}]
            })),
        ),
        Upstream::OnlyServes(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": "model is not found"}})),
        ),
        Upstream::Overloaded => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"code": 503, "message": "The model is overloaded."}})),
        ),
        Upstream::EchoesKey => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": format!("API key {} not valid", API_KEY)}})),
        ),
    }
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_fake_gemini(behaviour: Upstream) -> (String, Arc<FakeGemini>) {
    let fake = Arc::new(FakeGemini {
        behaviour,
        paths: Mutex::new(Vec::new()),
        keys: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .fallback(fake_gemini_handler)
        .with_state(fake.clone());
    (spawn(router).await, fake)
}

async fn spawn_gateway(remote: RemoteConfig) -> String {
    let resolver = CascadeResolver::from_config(&remote).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        AdvisoryGateway::new(Arc::new(resolver))
            .serve_on(listener)
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

fn remote_for(base_url: &str) -> RemoteConfig {
    RemoteConfig {
        api_key: Some(API_KEY.to_string()),
        base_url: base_url.to_string(),
        candidate_timeout_seconds: 5,
        ..RemoteConfig::default()
    }
}

fn boundary(gateway_url: &str) -> HttpBoundary {
    HttpBoundary::new(gateway_url, Duration::from_secs(10)).unwrap()
}

fn advice_request() -> AdvisoryRequest {
    AdvisoryRequest::advice(json!({"flight": {"origin": "LAX", "destination": "JFK"}}))
}

#[tokio::test]
async fn test_gateway_walks_candidates_until_one_answers() {
    let (gemini_url, fake) =
        spawn_fake_gemini(Upstream::OnlyServes("/v1/models/gemini-pro:generateContent")).await;
    let gateway_url = spawn_gateway(remote_for(&gemini_url)).await;

    let result = boundary(&gateway_url)
        .request_advisory(&advice_request())
        .await
        .unwrap();

    assert_eq!(result.text, "Leave early; storms at JFK.");
    assert_eq!(result.provider, "gemini:v1:gemini-pro");

    let paths = fake.paths.lock().unwrap().clone();
    assert_eq!(paths.len(), 12);
    assert_eq!(paths[0], "/v1beta/models/gemini-1.5-flash:generateContent");
    assert!(fake.keys.lock().unwrap().iter().all(|k| k == API_KEY));
}

#[tokio::test]
async fn test_gateway_reports_overloaded_provider_as_bad_gateway() {
    let (gemini_url, fake) = spawn_fake_gemini(Upstream::Overloaded).await;
    let gateway_url = spawn_gateway(remote_for(&gemini_url)).await;

    let err = boundary(&gateway_url)
        .request_advisory(&advice_request())
        .await
        .unwrap_err();

    assert!(matches!(err, BoundaryError::Status { status: 502, .. }), "got {:?}", err);
    assert_eq!(fake.paths.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_orchestrator_over_http_settles_with_error_provider() {
    let (gemini_url, _fake) = spawn_fake_gemini(Upstream::Overloaded).await;
    let gateway_url = spawn_gateway(remote_for(&gemini_url)).await;

    let orchestrator =
        AdvisoryOrchestrator::initialize(None, Arc::new(boundary(&gateway_url))).await;
    let result = orchestrator.generate(advice_request()).await;

    assert_eq!(result.provider, PROVIDER_ERROR);
    assert!(!result.text.is_empty());
}

#[tokio::test]
async fn test_credential_never_leaks_into_error_info() {
    let (gemini_url, _fake) = spawn_fake_gemini(Upstream::EchoesKey).await;
    let gateway_url = spawn_gateway(remote_for(&gemini_url)).await;

    let result = boundary(&gateway_url)
        .request_advisory(&AdvisoryRequest::rewrite("Flight is delayed by two hours."))
        .await
        .unwrap();

    assert_eq!(result.provider, PROVIDER_STUB_FALLBACK);
    let info = result.error_info.unwrap();
    assert!(!info.contains(API_KEY), "key leaked: {}", info);
    assert!(info.contains("[REDACTED]"));
}

#[tokio::test]
async fn test_gateway_without_credential_answers_with_stub() {
    let gateway_url = spawn_gateway(RemoteConfig::default()).await;

    let result = boundary(&gateway_url)
        .request_advisory(&advice_request())
        .await
        .unwrap();

    assert_eq!(result.provider, PROVIDER_STUB);
    assert!(result.text.contains("LAX to JFK"));
}

#[tokio::test]
async fn test_gateway_rejects_rewrite_without_prior_text() {
    let gateway_url = spawn_gateway(RemoteConfig::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/advisory", gateway_url))
        .json(&json!({"mode": "rewrite", "priorText": "   ", "context": null}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("prior"));
}

#[tokio::test]
async fn test_health_reports_remote_configuration() {
    let gateway_url = spawn_gateway(RemoteConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/api/health", gateway_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        json!({"ok": true, "remote_configured": false, "preferred_model": "gemini-1.5-flash"})
    );
}
