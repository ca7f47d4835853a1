use std::sync::Arc;

use serde::Serialize;

use crate::cfg;
use crate::db::Company;
use crate::tenancy::{CompanyCode, CompanyDirectory, ConnectionDescriptor, TenantError};

/// Values substituted for missing or unusable registry fields.
#[derive(Clone, Debug)]
pub struct ConnectionDefaults {
    pub loopback_host: String,
    pub port: u16,
    pub user: String,
}

impl From<&cfg::TenantSettings> for ConnectionDefaults {
    fn from(settings: &cfg::TenantSettings) -> Self {
        Self {
            loopback_host: settings.loopback_host.clone(),
            port: settings.default_port,
            user: settings.default_user.clone(),
        }
    }
}

/// Read-only view of a company, served even when the company is inactive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompanyStatus {
    pub code: CompanyCode,
    pub name: String,
    pub active: bool,
    pub payroll_enable: bool,
    pub show_survey: bool,
    pub show_feedback: bool,
    pub has_logo: bool,
}

impl From<&Company> for CompanyStatus {
    fn from(company: &Company) -> Self {
        Self {
            code: CompanyCode::new(&company.company_code),
            name: company.name.clone(),
            active: company.active,
            payroll_enable: company.payroll_enable,
            show_survey: company.show_survey,
            show_feedback: company.show_feedback,
            has_logo: company.has_logo,
        }
    }
}

/// Turns a company code into connection parameters via the master registry.
#[derive(Clone)]
pub struct TenantResolver {
    directory: Arc<dyn CompanyDirectory>,
    defaults: ConnectionDefaults,
}

impl TenantResolver {
    #[must_use]
    pub fn new(directory: Arc<dyn CompanyDirectory>, defaults: ConnectionDefaults) -> Self {
        Self { directory, defaults }
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<dyn CompanyDirectory> {
        &self.directory
    }

    /// Connection parameters of an active company.
    pub async fn resolve(&self, code: &CompanyCode) -> Result<ConnectionDescriptor, TenantError> {
        let company = self.lookup(code).await?;
        if !company.active {
            tracing::warn!(company_code = %code, "Refusing to route to inactive company");
            return Err(TenantError::TenantInactive { code: code.clone() });
        }

        let descriptor = self.descriptor_for(code, &company);
        tracing::debug!(company_code = %code, database = %descriptor, "Resolved company database");
        Ok(descriptor)
    }

    /// Flags of a company regardless of whether it is active.
    pub async fn status(&self, code: &CompanyCode) -> Result<CompanyStatus, TenantError> {
        let company = self.lookup(code).await?;
        Ok(CompanyStatus::from(&company))
    }

    async fn lookup(&self, code: &CompanyCode) -> Result<Company, TenantError> {
        if code.is_blank() {
            return Err(TenantError::TenantNotFound { code: code.clone() });
        }

        self.directory
            .find_by_code(code)
            .await
            .map_err(|source| TenantError::RegistryUnavailable { code: code.clone(), source })?
            .ok_or_else(|| TenantError::TenantNotFound { code: code.clone() })
    }

    /// Applies defaults and host normalization to a registry row.
    #[must_use]
    pub fn descriptor_for(&self, code: &CompanyCode, company: &Company) -> ConnectionDescriptor {
        let host = match non_blank(company.server_host.as_deref()) {
            Some(host) if host.eq_ignore_ascii_case("localhost") => self.defaults.loopback_host.clone(),
            Some(host) => host.to_string(),
            None => self.defaults.loopback_host.clone(),
        };

        let port = company
            .server_port
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port != 0)
            .unwrap_or(self.defaults.port);

        let user = non_blank(company.server_user.as_deref())
            .map_or_else(|| self.defaults.user.clone(), str::to_string);

        let database = non_blank(company.database_name.as_deref())
            .map_or_else(|| code.as_str().to_lowercase(), str::to_string);

        ConnectionDescriptor {
            host,
            port,
            user,
            password: company.server_password.clone().unwrap_or_default(),
            database,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
