use async_trait::async_trait;

use crate::core::DbError;
use crate::db::{Company, CompanyLogo};
use crate::tenancy::CompanyCode;

/// Read access to the master registry of companies.
///
/// The HTTP layer and the pool cache only see this trait; the PostgreSQL
/// implementation lives in `db::PgCompanyDirectory`.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Looks a company up by its normalized code.
    async fn find_by_code(&self, code: &CompanyCode) -> Result<Option<Company>, DbError>;

    /// All registered companies, active or not, ordered by code.
    async fn list(&self) -> Result<Vec<Company>, DbError>;

    /// Logo bytes and mime type, if the company uploaded one.
    async fn find_logo(&self, code: &CompanyCode) -> Result<Option<CompanyLogo>, DbError>;

    /// Round-trip to the registry store.
    async fn ping(&self) -> Result<(), DbError>;
}
