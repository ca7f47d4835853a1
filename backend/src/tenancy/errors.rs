use thiserror::Error;

use crate::core::{self, DbError};
use crate::tenancy::CompanyCode;

/// Failures of tenant routing and of operations against a tenant database.
///
/// Every variant names the company so that operators can tell which tenant
/// is misconfigured straight from the log line or the HTTP response.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Company `{code}` is not registered")]
    TenantNotFound { code: CompanyCode },

    #[error("Company `{code}` is inactive")]
    TenantInactive { code: CompanyCode },

    #[error("Cannot reach the database of company `{code}`: {source}")]
    ConnectionError {
        code: CompanyCode,
        #[source]
        source: sqlx::Error,
    },

    #[error("Query failed on the database of company `{code}`: {source}")]
    QueryError {
        code: CompanyCode,
        #[source]
        source: sqlx::Error,
    },

    #[error("Company registry is unavailable while resolving `{code}`: {source}")]
    RegistryUnavailable {
        code: CompanyCode,
        #[source]
        source: DbError,
    },
}

impl TenantError {
    /// Splits a raw sqlx failure into `ConnectionError` or `QueryError`.
    #[must_use]
    pub fn from_sqlx(code: &CompanyCode, source: sqlx::Error) -> Self {
        if core::is_connection_failure(&source) {
            Self::ConnectionError { code: code.clone(), source }
        } else {
            Self::QueryError { code: code.clone(), source }
        }
    }

    #[must_use]
    pub const fn code(&self) -> &CompanyCode {
        match self {
            Self::TenantNotFound { code }
            | Self::TenantInactive { code }
            | Self::ConnectionError { code, .. }
            | Self::QueryError { code, .. }
            | Self::RegistryUnavailable { code, .. } => code,
        }
    }
}
