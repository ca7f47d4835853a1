use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::core;
use crate::db::{self, NewAuditLog};
use crate::tenancy::{CompanyCode, TenantError};

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    50
}

pub async fn get_employee(
    State(context): State<core::ArcContext>,
    Path((code, emp_no)): Path<(String, String)>,
) -> Result<Response, TenantError> {
    let tenant = context.tenants.get_pool(&CompanyCode::new(&code)).await?;
    match db::employees::find_by_emp_no(&tenant, &emp_no).await? {
        Some(employee) => Ok(Json(json!({ "result": "ok", "employee": employee })).into_response()),
        None => {
            let body = Json(json!({
                "result": "error",
                "company_code": tenant.code().as_str(),
                "message": format!("Employee `{emp_no}` not found"),
            }));
            Ok((StatusCode::NOT_FOUND, body).into_response())
        }
    }
}

pub async fn record_audit_log(
    State(context): State<core::ArcContext>,
    Path(code): Path<String>,
    Json(entry): Json<NewAuditLog>,
) -> Result<impl IntoResponse, TenantError> {
    let tenant = context.tenants.get_pool(&CompanyCode::new(&code)).await?;
    let log = db::audit_logs::record(&tenant, entry).await?;
    Ok((StatusCode::CREATED, Json(json!({ "result": "ok", "audit_log": log }))))
}

pub async fn list_audit_logs(
    State(context): State<core::ArcContext>,
    Path((code, emp_no)): Path<(String, String)>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, TenantError> {
    let tenant = context.tenants.get_pool(&CompanyCode::new(&code)).await?;
    let logs = db::audit_logs::recent_for_employee(&tenant, &emp_no, query.limit).await?;
    Ok(Json(json!({ "result": "ok", "audit_logs": logs })))
}
