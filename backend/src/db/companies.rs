use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::{DbContext, DbError};
use crate::tenancy::{CompanyCode, CompanyDirectory, Password};

/// Row of the master `companies` table, without the logo bytes.
#[derive(Clone, Debug, Serialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub company_code: String,
    pub name: String,
    pub database_name: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<i32>,
    pub server_user: Option<String>,
    #[serde(skip)]
    pub server_password: Option<Password>,
    pub active: bool,
    pub payroll_enable: bool,
    pub show_survey: bool,
    pub show_feedback: bool,
    pub logo_mime_type: Option<String>,
    pub has_logo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewCompany {
    pub company_code: String,
    pub name: String,
    pub database_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub server_user: String,
    pub server_password: Password,
    pub active: bool,
}

/// New connection target of an existing company; `None` keeps the current value.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionUpdate {
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_name: Option<String>,
}

#[derive(Clone, Debug, FromRow)]
pub struct CompanyLogo {
    pub logo_image: Vec<u8>,
    pub logo_mime_type: Option<String>,
}

const SELECT_COMPANY: &str = r"
    SELECT
        id,
        company_code,
        name,
        database_name,
        server_host,
        server_port,
        server_user,
        server_password,
        COALESCE(active, FALSE) AS active,
        COALESCE(payroll_enable, FALSE) AS payroll_enable,
        COALESCE(show_survey, FALSE) AS show_survey,
        COALESCE(show_feedback, FALSE) AS show_feedback,
        logo_mime_type,
        (logo_image IS NOT NULL) AS has_logo,
        created_at,
        updated_at
    FROM companies
";

/// Master registry backed by the `companies` table.
pub struct PgCompanyDirectory {
    db: DbContext,
}

impl PgCompanyDirectory {
    #[must_use]
    pub const fn new(db: DbContext) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn db(&self) -> &DbContext {
        &self.db
    }
}

#[async_trait]
impl CompanyDirectory for PgCompanyDirectory {
    async fn find_by_code(&self, code: &CompanyCode) -> Result<Option<Company>, DbError> {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"{SELECT_COMPANY} WHERE UPPER(TRIM(company_code) COLLATE "C") = $1"#
        ))
        .bind(code.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(company)
    }

    async fn list(&self) -> Result<Vec<Company>, DbError> {
        let companies = sqlx::query_as::<_, Company>(&format!("{SELECT_COMPANY} ORDER BY company_code"))
            .fetch_all(&self.db)
            .await?;
        Ok(companies)
    }

    async fn find_logo(&self, code: &CompanyCode) -> Result<Option<CompanyLogo>, DbError> {
        let logo = sqlx::query_as::<_, CompanyLogo>(
            r#"
            SELECT logo_image, logo_mime_type
            FROM companies
            WHERE UPPER(TRIM(company_code) COLLATE "C") = $1 AND logo_image IS NOT NULL
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(logo)
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.db).await?;
        Ok(())
    }
}

/// Registers a company. The code is stored normalized.
pub async fn insert_company(db: &DbContext, new_company: NewCompany) -> Result<Company, DbError> {
    let code = CompanyCode::new(&new_company.company_code);
    let company = sqlx::query_as::<_, Company>(&format!(
        r"
        WITH inserted AS (
            INSERT INTO companies
                (company_code, name, database_name, server_host, server_port, server_user, server_password, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
        )
        {}
        ",
        SELECT_COMPANY.replace("FROM companies", "FROM inserted")
    ))
    .bind(code.as_str())
    .bind(&new_company.name)
    .bind(&new_company.database_name)
    .bind(&new_company.server_host)
    .bind(i32::from(new_company.server_port))
    .bind(&new_company.server_user)
    .bind(&new_company.server_password)
    .bind(new_company.active)
    .fetch_one(db)
    .await?;
    Ok(company)
}

/// Returns false when no company has this code.
pub async fn set_active(db: &DbContext, code: &CompanyCode, active: bool) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE companies
        SET active = $2, updated_at = NOW()
        WHERE UPPER(TRIM(company_code) COLLATE "C") = $1
        "#,
    )
    .bind(code.as_str())
    .bind(active)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns false when no company has this code.
pub async fn update_connection(db: &DbContext, code: &CompanyCode, update: ConnectionUpdate) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE companies
        SET server_host = COALESCE($2, server_host),
            server_port = COALESCE($3, server_port),
            database_name = COALESCE($4, database_name),
            updated_at = NOW()
        WHERE UPPER(TRIM(company_code) COLLATE "C") = $1
        "#,
    )
    .bind(code.as_str())
    .bind(update.server_host)
    .bind(update.server_port.map(i32::from))
    .bind(update.database_name)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
