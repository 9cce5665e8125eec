//! HTTP handlers for the bootstrap and health API.
//!
//! Status codes are a pure function of orchestrator state.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::bootstrap::{BootstrapError, BootstrapResult, DeepHealthReport};
use crate::http::server::AppState;
use crate::resilience::Deadline;

#[derive(Serialize)]
pub struct DeepHealthBody {
    pub status: &'static str,
    pub dependencies: DeepHealthReport,
}

/// `POST /api/v1/bootstrap`: start a run in the background.
pub async fn trigger_bootstrap(State(state): State<AppState>) -> impl IntoResponse {
    match state
        .orchestrator
        .spawn_bootstrap(Deadline::after(state.bootstrap_timeout))
    {
        Ok(_) => {
            tracing::info!("Bootstrap accepted");
            (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
        }
        Err(BootstrapError::InProgress) => {
            (StatusCode::CONFLICT, Json(json!({ "status": "in-progress" })))
        }
    }
}

/// `GET /api/v1/bootstrap`: last result, or the in-progress placeholder.
pub async fn bootstrap_status(State(state): State<AppState>) -> Response {
    match state.orchestrator.current_result() {
        Some(result) => Json(BootstrapResult::clone(&result)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no bootstrap run has completed" })),
        )
            .into_response(),
    }
}

/// `GET /health`: liveness only.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "mode": "shallow" }))
}

/// `GET /health/deep`: probe every dependency.
pub async fn deep_health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state
        .orchestrator
        .run_deep_health(Deadline::after(state.deep_health_timeout))
        .await;

    let healthy = report.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(DeepHealthBody {
            status: if healthy { "healthy" } else { "unhealthy" },
            dependencies: report,
        }),
    )
}

/// `GET /ready`: true once the last completed bootstrap succeeded.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.orchestrator.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "ready": ready })))
}
