use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::cfg;
use crate::core::{self, DbError};
use crate::db::{Company, CompanyLogo};
use crate::tenancy::{CompanyCode, CompanyDirectory, Password};

/// In-memory registry that counts how often it is asked for a company.
///
/// Lookups yield once before answering, so futures joined on one task
/// interleave the way concurrent requests do.
#[derive(Default)]
pub struct FakeDirectory {
    companies: Mutex<Vec<Company>>,
    logos: HashMap<CompanyCode, CompanyLogo>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl FakeDirectory {
    pub fn with(companies: Vec<Company>) -> Self {
        Self { companies: Mutex::new(companies), ..Default::default() }
    }

    pub fn unavailable() -> Self {
        Self { unavailable: AtomicBool::new(true), ..Default::default() }
    }

    pub fn with_logo(mut self, code: &str, mime: &str, bytes: &[u8]) -> Self {
        self.logos.insert(
            CompanyCode::new(code),
            CompanyLogo { logo_image: bytes.to_vec(), logo_mime_type: Some(mime.to_string()) },
        );
        for company in self.companies.get_mut().unwrap().iter_mut() {
            if CompanyCode::new(&company.company_code) == CompanyCode::new(code) {
                company.has_logo = true;
                company.logo_mime_type = Some(mime.to_string());
            }
        }
        self
    }

    /// Flips `active` the way `companies activate|deactivate` does in the registry.
    pub fn set_active(&self, code: &str, active: bool) {
        self.update(code, |company| company.active = active);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn repoint(&self, code: &str, host: &str, database: &str) {
        self.update(code, |company| {
            company.server_host = Some(host.to_string());
            company.database_name = Some(database.to_string());
        });
    }

    fn update(&self, code: &str, change: impl Fn(&mut Company)) {
        let code = CompanyCode::new(code);
        for company in self.companies.lock().unwrap().iter_mut() {
            if CompanyCode::new(&company.company_code) == code {
                change(company);
            }
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::ConnectionFailed(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CompanyDirectory for FakeDirectory {
    async fn find_by_code(&self, code: &CompanyCode) -> Result<Option<Company>, DbError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_available()?;
        Ok(self
            .companies
            .lock()
            .unwrap()
            .iter()
            .find(|company| CompanyCode::new(&company.company_code) == *code)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Company>, DbError> {
        self.check_available()?;
        Ok(self.companies.lock().unwrap().clone())
    }

    async fn find_logo(&self, code: &CompanyCode) -> Result<Option<CompanyLogo>, DbError> {
        self.check_available()?;
        Ok(self.logos.get(code).cloned())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.check_available()
    }
}

pub fn company(code: &str, active: bool, host: &str, port: i32, database: &str) -> Company {
    let now = Utc::now();
    Company {
        id: 1,
        company_code: code.to_string(),
        name: format!("{code} Sdn Bhd"),
        database_name: Some(database.to_string()),
        server_host: Some(host.to_string()),
        server_port: Some(port),
        server_user: Some("hr_app".to_string()),
        server_password: Some(Password::new("s3cret")),
        active,
        payroll_enable: true,
        show_survey: false,
        show_feedback: true,
        logo_mime_type: None,
        has_logo: false,
        created_at: now,
        updated_at: now,
    }
}

/// A company with nothing but a code and a name filled in.
pub fn bare_company(code: &str) -> Company {
    Company {
        database_name: None,
        server_host: None,
        server_port: None,
        server_user: None,
        server_password: None,
        ..company(code, true, "", 0, "")
    }
}

pub fn tenant_settings() -> cfg::TenantSettings {
    cfg::TenantSettings {
        connect_timeout_secs: 1,
        idle_timeout_secs: 0,
        ..Default::default()
    }
}

pub fn context_with(directory: Arc<FakeDirectory>) -> core::ArcContext {
    let settings = cfg::AppSettings { tenants: tenant_settings(), ..Default::default() };
    core::Context::new(directory, settings)
}
