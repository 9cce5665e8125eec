//! End-to-end tests of the HTTP API over a real listener.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use cortex::config::ServerConfig;
use serde_json::Value;
use tokio::sync::Semaphore;

mod common;

use common::{FakeAdapter, FakeStack};

async fn get(base: &str, path: &str) -> (StatusCode, Value) {
    let res = reqwest::get(format!("{}{}", base, path)).await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn post(base: &str, path: &str) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn wait_until_ready(base: &str) {
    for _ in 0..100 {
        if get(base, "/ready").await.0 == StatusCode::OK {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("service never became ready");
}

#[tokio::test]
async fn test_liveness() {
    let api = common::start_api(FakeStack::healthy().orchestrator()).await;

    let (status, body) = get(&api.base, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "healthy", "mode": "shallow"}));
}

#[tokio::test]
async fn test_bootstrap_trigger_and_readiness() {
    let gate = Arc::new(Semaphore::new(0));
    let mut stack = FakeStack::healthy();
    stack.nats = Arc::new(FakeAdapter::gated(Arc::clone(&gate)));
    let api = common::start_api(stack.orchestrator()).await;

    let (status, body) = get(&api.base, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, serde_json::json!({"ready": false}));

    let (status, body) = get(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = post(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, serde_json::json!({"status": "accepted"}));

    let (status, body) = post(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, serde_json::json!({"status": "in-progress"}));

    let (_, body) = get(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(body["status"], "in-progress");

    gate.add_permits(1);
    wait_until_ready(&api.base).await;

    let (status, body) = get(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    for name in ["postgres", "nats", "pulsar", "redis"] {
        assert_eq!(body["phases"][name]["status"], "ok");
        assert!(body["phases"][name].get("error").is_none());
    }
}

#[tokio::test]
async fn test_failed_bootstrap_is_not_ready() {
    let stack = FakeStack::healthy();
    stack.redis.fail(true);
    let orchestrator = stack.orchestrator();
    let api = common::start_api(Arc::clone(&orchestrator)).await;

    let (status, _) = post(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    while orchestrator.last_result().is_none() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, _) = get(&api.base, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, body) = get(&api.base, "/api/v1/bootstrap").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["phases"]["redis"]["error"], "connection refused");
}

#[tokio::test]
async fn test_deep_health() {
    let stack = FakeStack::healthy();
    let api = common::start_api(stack.orchestrator()).await;

    let (status, body) = get(&api.base, "/health/deep").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    let dependencies = body["dependencies"].as_object().unwrap();
    assert_eq!(dependencies.len(), 4);
    assert_eq!(dependencies["postgres"]["ok"], true);
    assert!(dependencies["postgres"]["latencyMs"].is_u64());

    stack.pulsar.fail(true);
    let (status, body) = get(&api.base, "/health/deep").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["dependencies"]["pulsar"]["ok"], false);
    assert_eq!(body["dependencies"]["pulsar"]["error"], "connection refused");
    assert_eq!(body["dependencies"]["redis"]["ok"], true);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let api = common::start_api(FakeStack::healthy().orchestrator()).await;

    let res = reqwest::Client::new()
        .get(format!("{}/health", api.base))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let api = common::start_api(FakeStack::healthy().orchestrator()).await;
    assert_eq!(get(&api.base, "/health").await.0, StatusCode::OK);

    api.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), api.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_drain_is_bounded() {
    let gate = Arc::new(Semaphore::new(0));
    let mut stack = FakeStack::healthy();
    stack.postgres = Arc::new(FakeAdapter::gated(Arc::clone(&gate)));
    let config = ServerConfig {
        shutdown_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let api = common::start_api_with(&config, stack.orchestrator()).await;

    let base = api.base.clone();
    let stuck = tokio::spawn(async move { reqwest::get(format!("{}/health/deep", base)).await });
    while stack.postgres.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    api.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), api.task)
        .await
        .expect("drain was not bounded")
        .unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);

    gate.add_permits(1);
    stuck.abort();
}
