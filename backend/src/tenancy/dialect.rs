use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::tenancy::CompanyCode;

/// Table layout of a tenant database.
///
/// Older company databases were provisioned by a different ERP export and
/// carry `x_`-prefixed, mixed-case column names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDialect {
    #[default]
    Standard,
    Legacy,
}

/// Physical names of the employee table and the columns we read from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmployeeColumns {
    pub table: &'static str,
    pub emp_no: &'static str,
    pub name: &'static str,
    pub active: &'static str,
}

impl SchemaDialect {
    #[must_use]
    pub const fn employee_columns(self) -> EmployeeColumns {
        match self {
            Self::Standard => EmployeeColumns {
                table: "hr_employee",
                emp_no: "emp_no",
                name: "name",
                active: "active",
            },
            Self::Legacy => EmployeeColumns {
                table: "hr_employee",
                emp_no: "x_Emp_No",
                name: "x_Name",
                active: "active",
            },
        }
    }
}

/// Dialect per company, fixed at startup.
#[derive(Clone, Debug, Default)]
pub struct DialectMap {
    dialects: HashMap<CompanyCode, SchemaDialect>,
}

impl DialectMap {
    #[must_use]
    pub fn from_settings(configured: &BTreeMap<String, SchemaDialect>) -> Self {
        let dialects = configured
            .iter()
            .map(|(code, dialect)| (CompanyCode::new(code), *dialect))
            .collect::<HashMap<_, _>>();
        if !dialects.is_empty() {
            tracing::info!(count = dialects.len(), "Loaded per-company schema dialects");
        }
        Self { dialects }
    }

    #[must_use]
    pub fn dialect_for(&self, code: &CompanyCode) -> SchemaDialect {
        self.dialects.get(code).copied().unwrap_or_default()
    }
}

/// Quotes an identifier for PostgreSQL. Only use it for names that come from
/// configuration; tenant-supplied values must be bound as parameters.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
