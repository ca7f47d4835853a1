use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::tenancy::{TenantError, TenantPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An app event worth keeping per tenant: clock-in attempts, leave submissions, logins.
#[derive(Clone, Debug, Deserialize)]
pub struct NewAuditLog {
    pub emp_no: Option<String>,
    pub user_id: Option<i64>,
    pub action: String,
    pub status: AuditStatus,
    pub remark: Option<String>,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub company_code: String,
    pub emp_no: Option<String>,
    pub user_id: Option<i64>,
    pub action: String,
    pub status: String,
    pub remark: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn record(tenant: &TenantPool, entry: NewAuditLog) -> Result<AuditLog, TenantError> {
    // An explicit JSON null would bypass the column default.
    let metadata = match entry.metadata {
        serde_json::Value::Null => empty_metadata(),
        metadata => metadata,
    };

    let log = sqlx::query_as::<_, AuditLog>(
        r"
        INSERT INTO app_audit_logs (id, company_code, emp_no, user_id, action, status, remark, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, company_code, emp_no, user_id, action, status, remark, metadata, created_at
        ",
    )
    .bind(Uuid::new_v4())
    .bind(tenant.code().as_str())
    .bind(&entry.emp_no)
    .bind(entry.user_id)
    .bind(&entry.action)
    .bind(entry.status.as_str())
    .bind(&entry.remark)
    .bind(&metadata)
    .fetch_one(tenant.pool())
    .await
    .map_err(|e| tenant.error(e))?;

    match entry.status {
        AuditStatus::Failed => tracing::warn!(
            event_type = "app_audit",
            company_code = %tenant.code(),
            emp_no = ?entry.emp_no,
            action = %entry.action,
            "Recorded failed action"
        ),
        AuditStatus::Success => tracing::info!(
            event_type = "app_audit",
            company_code = %tenant.code(),
            emp_no = ?entry.emp_no,
            action = %entry.action,
            "Recorded action"
        ),
    }

    Ok(log)
}

pub async fn recent_for_employee(tenant: &TenantPool, emp_no: &str, limit: i64) -> Result<Vec<AuditLog>, TenantError> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r"
        SELECT id, company_code, emp_no, user_id, action, status, remark, metadata, created_at
        FROM app_audit_logs
        WHERE emp_no = $1
        ORDER BY created_at DESC
        LIMIT $2
        ",
    )
    .bind(emp_no.trim())
    .bind(limit.clamp(1, 500))
    .fetch_all(tenant.pool())
    .await
    .map_err(|e| tenant.error(e))?;
    Ok(logs)
}
