use std::collections::BTreeMap;
use std::time::Duration;

use config::ConfigError;
use serde::{Deserialize, Serialize};

use crate::tenancy::SchemaDialect;

/// Tuning for the per-company connection pools and the defaults applied to
/// incomplete registry rows.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TenantSettings {
    #[serde(default)]
    pub max_connections: u32,

    #[serde(default)]
    pub min_connections: u32,

    /// Upper bound for establishing a connection to a tenant database.
    #[serde(default)]
    pub connect_timeout_secs: u64,

    /// Zero disables idle reaping.
    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// Replaces `localhost` in registry rows; name resolution of `localhost`
    /// is unreliable inside some container network stacks.
    #[serde(default)]
    pub loopback_host: String,

    #[serde(default)]
    pub default_port: u16,

    /// How long a cached pool is trusted before the registry is asked again
    /// whether its company is still active and still points at the same
    /// database. Zero re-checks on every access.
    #[serde(default)]
    pub recheck_interval_secs: u64,

    #[serde(default)]
    pub default_user: String,

    /// Company code -> schema dialect. Codes not listed use the standard layout.
    #[serde(default)]
    pub dialects: BTreeMap<String, SchemaDialect>,
}

impl TenantSettings {
    /// The loopback literal must be an address; passing `localhost` on would
    /// defeat the rewrite of `localhost` registry rows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.loopback_host.trim();
        if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
            return Err(ConfigError::Message(format!(
                "tenants.loopback_host must be an IP literal such as 127.0.0.1, got `{}`",
                self.loopback_host
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
            loopback_host: "127.0.0.1".to_string(),
            default_port: 5432,
            recheck_interval_secs: 30,
            default_user: "postgres".to_string(),
            dialects: BTreeMap::new(),
        }
    }
}
