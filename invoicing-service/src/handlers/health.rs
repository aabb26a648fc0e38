use crate::startup::AppState;
use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "invoicing-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the invoice store answers.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.invoices.repository().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "database": "connected" })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready", "database": "unavailable" })),
            )
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        service_core::observability::get_metrics(),
    )
}
