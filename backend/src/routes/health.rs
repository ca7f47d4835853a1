use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::core;

pub async fn health_check(State(context): State<core::ArcContext>) -> Result<impl IntoResponse, axum::response::Response> {
    context.registry.ping().await.map_err(|e| {
        tracing::error!("Health check failed to reach the company registry: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, "Company registry unavailable").into_response()
    })?;

    Ok((StatusCode::OK, "OK").into_response())
}
