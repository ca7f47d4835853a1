use std::sync::Arc;

use crate::cfg;
use crate::tenancy::{CompanyDirectory, TenantPools};

pub type ArcContext = Arc<Context>;

pub struct Context {
    pub registry: Arc<dyn CompanyDirectory>,
    pub tenants: TenantPools,
    pub settings: cfg::AppSettings,
}

impl Context {
    #[must_use]
    pub fn new(registry: Arc<dyn CompanyDirectory>, settings: cfg::AppSettings) -> ArcContext {
        Self {
            tenants: TenantPools::new(Arc::clone(&registry), &settings.tenants),
            registry,
            settings,
        }
        .into()
    }
}
