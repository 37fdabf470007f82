use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Liveness check.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "chat-proxy",
            "version": env!("CARGO_PKG_VERSION"),
            "provider": state.provider.name(),
        })),
    )
}

/// Ready once the completion provider answers its health check.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.provider.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, provider = state.provider.name(), "Provider not ready");
        AppError::ServiceUnavailable
    })?;
    Ok(Json(json!({ "status": "ready" })))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
