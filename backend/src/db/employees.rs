use serde::Serialize;
use sqlx::FromRow;

use crate::tenancy::{SchemaDialect, TenantError, TenantPool, quote_ident};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromRow)]
pub struct Employee {
    pub emp_no: String,
    pub name: Option<String>,
    pub active: bool,
}

/// Builds the lookup statement for a tenant's table layout. Identifiers come
/// from the dialect, the employee number is always bound as `$1`.
#[must_use]
pub fn find_by_emp_no_sql(dialect: SchemaDialect) -> String {
    let columns = dialect.employee_columns();
    let emp_no = quote_ident(columns.emp_no);
    format!(
        "SELECT {emp_no}::text AS emp_no, {name}::text AS name, COALESCE({active}, TRUE) AS active \
         FROM {table} WHERE {emp_no}::text = $1 LIMIT 1",
        name = quote_ident(columns.name),
        active = quote_ident(columns.active),
        table = quote_ident(columns.table),
    )
}

pub async fn find_by_emp_no(tenant: &TenantPool, emp_no: &str) -> Result<Option<Employee>, TenantError> {
    let employee = sqlx::query_as::<_, Employee>(&find_by_emp_no_sql(tenant.dialect()))
        .bind(emp_no.trim())
        .fetch_optional(tenant.pool())
        .await
        .map_err(|e| tenant.error(e))?;
    Ok(employee)
}
