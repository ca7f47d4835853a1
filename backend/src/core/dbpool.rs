use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::cfg;
use crate::core::DbError;

/// Pool of the master registry database.
pub type DbContext = sqlx::PgPool;

pub async fn create_db_context(db_config: &cfg::DatabaseSettings) -> Result<DbContext, DbError> {
    let options = PgConnectOptions::from_str(&db_config.url)
        .map_err(DbError::ConnectionFailed)?
        .application_name(env!("CARGO_PKG_NAME"));

    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout_secs))
        .connect_with(options)
        .await
        .map_err(DbError::ConnectionFailed)?;

    tracing::info!("Master database initialized successfully");
    Ok(pool)
}
