use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::core;
use crate::tenancy::{CompanyCode, TenantError};

impl IntoResponse for TenantError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::TenantNotFound { .. } => StatusCode::NOT_FOUND,
            Self::TenantInactive { .. } => StatusCode::FORBIDDEN,
            Self::ConnectionError { .. } | Self::RegistryUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::QueryError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(company_code = %self.code(), error_message = %self, "Tenant request failed");
        } else {
            tracing::warn!(company_code = %self.code(), error_message = %self, "Tenant request rejected");
        }

        let body = Json(json!({
            "result": "error",
            "company_code": self.code().as_str(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Company flags for the mobile client; answered for inactive companies too.
pub async fn status(
    State(context): State<core::ArcContext>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, TenantError> {
    let status = context.tenants.resolver().status(&CompanyCode::new(&code)).await?;
    Ok(Json(json!({ "result": "ok", "company": status })))
}

pub async fn logo(State(context): State<core::ArcContext>, Path(code): Path<String>) -> Result<Response, TenantError> {
    let code = CompanyCode::new(&code);
    context.tenants.resolver().status(&code).await?;

    let logo = context
        .registry
        .find_logo(&code)
        .await
        .map_err(|source| TenantError::RegistryUnavailable { code: code.clone(), source })?;

    let Some(logo) = logo else {
        let body = Json(json!({ "result": "error", "company_code": code.as_str(), "message": "No logo uploaded" }));
        return Ok((StatusCode::NOT_FOUND, body).into_response());
    };

    let content_type = logo
        .logo_mime_type
        .as_deref()
        .and_then(|mime| HeaderValue::from_str(mime).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    Ok(([(header::CONTENT_TYPE, content_type)], logo.logo_image).into_response())
}

/// Opens (or reuses) the company pool and round-trips to its database.
pub async fn ping(State(context): State<core::ArcContext>, Path(code): Path<String>) -> Result<impl IntoResponse, TenantError> {
    let tenant = context.tenants.get_pool(&CompanyCode::new(&code)).await?;
    tenant.ping().await?;
    Ok(Json(json!({
        "result": "ok",
        "company_code": tenant.code().as_str(),
        "database": tenant.descriptor().database,
    })))
}

/// Drops the cached pool so the next request re-reads the registry row.
pub async fn drop_pool(State(context): State<core::ArcContext>, Path(code): Path<String>) -> impl IntoResponse {
    let code = CompanyCode::new(&code);
    let dropped = context.tenants.invalidate(&code).await;
    Json(json!({ "result": "ok", "company_code": code.as_str(), "dropped": dropped }))
}

pub async fn cached_pools(State(context): State<core::ArcContext>) -> impl IntoResponse {
    Json(json!({ "result": "ok", "companies": context.tenants.cached_codes().await }))
}
