use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;
use service_core::observability::render_metrics;

use crate::startup::AppState;

/// Banner for `GET /`.
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Server is running" }))
}

/// Health check endpoint for liveness probes.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "calculator-service",
            "environment": state.config.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check: ready once the analyzer backend answers its health check.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state
        .calculator
        .analyzer()
        .health_check()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Analyzer health check failed");
            AppError::ServiceUnavailable(e.to_string())
        })?;

    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        render_metrics(),
    )
}
