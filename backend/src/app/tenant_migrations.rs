use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::core::DbError;
use crate::tenancy::{CompanyCode, TenantError, TenantPool, TenantPools};

/// One schema step applied to every company database.
#[derive(Clone, Copy, Debug)]
pub struct TenantMigration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

impl TenantMigration {
    /// Hex SHA-256 of the SQL text; recorded when the step is applied.
    #[must_use]
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

/// Ordered by version. Never edit an entry that has shipped; append a new one.
pub static TENANT_MIGRATIONS: &[TenantMigration] = &[
    TenantMigration {
        version: 1,
        description: "app audit logs",
        sql: include_str!("../../migrations/tenant/0001_app_audit_logs.sql"),
    },
    TenantMigration {
        version: 2,
        description: "app audit logs indexes",
        sql: include_str!("../../migrations/tenant/0002_app_audit_logs_indexes.sql"),
    },
];

// Advisory lock held while a step runs.
const MIGRATION_LOCK_KEY: i64 = 0x4852_4d49_4752;

const CREATE_TRACKING_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS app_schema_migrations (
        version     BIGINT PRIMARY KEY,
        description TEXT NOT NULL,
        checksum    TEXT NOT NULL,
        applied_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

#[derive(Debug, Error)]
pub enum TenantMigrationError {
    #[error("Migration {version} of company `{code}` was applied with a different checksum (recorded {recorded}, expected {expected})")]
    ChecksumMismatch {
        code: CompanyCode,
        version: i64,
        recorded: String,
        expected: String,
    },

    #[error("Company `{code}` has migration {version} applied, which this build does not know")]
    UnknownVersion { code: CompanyCode, version: i64 },

    #[error("Migration {version} ({description}) failed for company `{code}`: {source}")]
    StepFailed {
        code: CompanyCode,
        version: i64,
        description: &'static str,
        #[source]
        source: TenantError,
    },

    #[error(transparent)]
    Tenant(#[from] TenantError),
}

/// A migration already recorded in a tenant database.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub checksum: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TenantMigrationReport {
    pub company_code: String,
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// Decides which steps still need to run, refusing to continue when the
/// recorded history disagrees with the embedded list.
pub fn plan<'a>(
    code: &CompanyCode,
    applied: &[AppliedMigration],
    available: &'a [TenantMigration],
) -> Result<Vec<&'a TenantMigration>, TenantMigrationError> {
    let known = available.iter().map(|m| (m.version, m)).collect::<BTreeMap<_, _>>();

    for record in applied {
        let migration = known.get(&record.version).ok_or_else(|| TenantMigrationError::UnknownVersion {
            code: code.clone(),
            version: record.version,
        })?;
        let expected = migration.checksum();
        if expected != record.checksum {
            return Err(TenantMigrationError::ChecksumMismatch {
                code: code.clone(),
                version: record.version,
                recorded: record.checksum.clone(),
                expected,
            });
        }
    }

    Ok(known
        .into_values()
        .filter(|m| !applied.iter().any(|a| a.version == m.version))
        .collect())
}

pub async fn applied_migrations(tenant: &TenantPool) -> Result<Vec<AppliedMigration>, TenantError> {
    // Concurrent CREATE TABLE IF NOT EXISTS can still collide in the catalog.
    let mut tx = tenant.pool().begin().await.map_err(|e| tenant.error(e))?;
    lock_migrations(tenant, &mut tx).await?;

    sqlx::raw_sql(CREATE_TRACKING_TABLE)
        .execute(&mut *tx)
        .await
        .map_err(|e| tenant.error(e))?;

    let applied = sqlx::query_as::<_, AppliedMigration>("SELECT version, checksum FROM app_schema_migrations ORDER BY version")
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| tenant.error(e))?;

    tx.commit().await.map_err(|e| tenant.error(e))?;
    Ok(applied)
}

async fn lock_migrations(tenant: &TenantPool, tx: &mut Transaction<'_, Postgres>) -> Result<(), TenantError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut **tx)
        .await
        .map_err(|e| tenant.error(e))?;
    Ok(())
}

/// Pending steps of one company without applying anything.
pub async fn pending_migrations(tenant: &TenantPool) -> Result<Vec<&'static TenantMigration>, TenantMigrationError> {
    let applied = applied_migrations(tenant).await?;
    plan(tenant.code(), &applied, TENANT_MIGRATIONS)
}

/// Applies every pending step to one company database, one transaction per step.
pub async fn run_tenant_migrations(tenant: &TenantPool) -> Result<TenantMigrationReport, TenantMigrationError> {
    apply_migrations(tenant, TENANT_MIGRATIONS).await
}

/// Applies the pending steps of `available`; stops at the first failing step,
/// leaving the earlier ones committed.
pub async fn apply_migrations(
    tenant: &TenantPool,
    available: &[TenantMigration],
) -> Result<TenantMigrationReport, TenantMigrationError> {
    let mut report = TenantMigrationReport {
        company_code: tenant.code().to_string(),
        ..Default::default()
    };

    let history = applied_migrations(tenant).await?;
    for migration in plan(tenant.code(), &history, available)? {
        let applied = apply_step(tenant, migration)
            .await
            .map_err(|source| TenantMigrationError::StepFailed {
                code: tenant.code().clone(),
                version: migration.version,
                description: migration.description,
                source,
            })?;

        if applied {
            tracing::info!(
                company_code = %tenant.code(),
                version = migration.version,
                description = migration.description,
                "Applied tenant migration"
            );
            report.applied.push(migration.version);
        } else {
            report.skipped.push(migration.version);
        }
    }

    Ok(report)
}

/// Runs one step and records it, all in one transaction. Returns false when a
/// concurrent runner applied the step first.
pub async fn apply_step(tenant: &TenantPool, migration: &TenantMigration) -> Result<bool, TenantError> {
    let mut tx = tenant.pool().begin().await.map_err(|e| tenant.error(e))?;
    lock_migrations(tenant, &mut tx).await?;

    let already_applied = sqlx::query_scalar::<_, i64>("SELECT version FROM app_schema_migrations WHERE version = $1")
        .bind(migration.version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| tenant.error(e))?
        .is_some();
    if already_applied {
        tx.rollback().await.map_err(|e| tenant.error(e))?;
        return Ok(false);
    }

    // Dropping `tx` on any error below rolls the step back.
    sqlx::raw_sql(migration.sql)
        .execute(&mut *tx)
        .await
        .map_err(|e| tenant.error(e))?;

    sqlx::query("INSERT INTO app_schema_migrations (version, description, checksum) VALUES ($1, $2, $3)")
        .bind(migration.version)
        .bind(migration.description)
        .bind(migration.checksum())
        .execute(&mut *tx)
        .await
        .map_err(|e| tenant.error(e))?;

    tx.commit().await.map_err(|e| tenant.error(e))?;
    Ok(true)
}

/// Outcome of migrating one company during a fleet run.
pub type TenantMigrationOutcome = (CompanyCode, Result<TenantMigrationReport, TenantMigrationError>);

/// Migrates every active company, or only `only` when given. A failing company
/// is reported and does not stop the others.
pub async fn run_for_companies(
    pools: &TenantPools,
    only: Option<&CompanyCode>,
) -> Result<Vec<TenantMigrationOutcome>, DbError> {
    let targets = match only {
        Some(code) => vec![code.clone()],
        None => pools
            .resolver()
            .directory()
            .list()
            .await?
            .into_iter()
            .filter(|company| company.active)
            .map(|company| CompanyCode::new(&company.company_code))
            .collect(),
    };

    let mut outcomes = Vec::with_capacity(targets.len());
    for code in targets {
        let outcome = match pools.get_pool(&code).await {
            Ok(tenant) => run_tenant_migrations(&tenant).await,
            Err(e) => Err(TenantMigrationError::from(e)),
        };
        if let Err(e) = &outcome {
            tracing::error!(company_code = %code, error = %e, "Tenant migration failed");
        }
        outcomes.push((code, outcome));
    }
    Ok(outcomes)
}
