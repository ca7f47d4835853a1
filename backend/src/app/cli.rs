use std::io::{self, Write};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app;
use crate::core;
use crate::db;
use crate::tenancy::{CompanyCode, Password};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Migration creation failed")]
    MigrationCreateFailed { #[source] source: app::MigrationError },

    // NoMigrationsApplied is handled as informational output.
    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: app::MigrationError },

    #[error("Running master migrations failed")]
    MigrationRunFailed { #[source] source: app::MigrationError },

    #[error("Tenant migrations failed for {failed} of {total} companies")]
    TenantMigrationsFailed { failed: usize, total: usize },

    #[error("Company registry operation failed")]
    RegistryOperationFailed { #[from] source: core::DbError },

    #[error("Company `{0}` is not registered")]
    CompanyNotFound(CompanyCode),

    #[error("Reading the password failed")]
    PasswordPromptFailed { #[source] source: io::Error },

    #[error("An unexpected CLI error occurred: {0}")]
    Other(String),
}

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = "Multi-tenant attendance backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Master and tenant database migrations
    #[command(subcommand)]
    Migrate(MigrateCommand),

    /// Manage the company registry
    #[command(subcommand)]
    Companies(CompanyCommand),
}

#[derive(Subcommand)]
pub enum MigrateCommand {
    /// Create a new master migration file
    Create {
        /// Name of the migration
        name: String,
    },
    /// List master and tenant migrations embedded in this build
    List,
    /// Show pending migrations of the master database and of active companies
    Status {
        /// Only check this company
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Apply pending master migrations
    Master,
    /// Apply pending tenant migrations to every active company
    Tenants {
        /// Only migrate this company
        #[arg(short, long)]
        company: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CompanyCommand {
    /// List registered companies
    List,
    /// Show one company and its resolved database target
    Show { code: String },
    /// Register a company; prompts for the database password
    Add {
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        database: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
        #[arg(long, default_value = "postgres")]
        user: String,
        /// Register the company disabled
        #[arg(long)]
        inactive: bool,
    },
    /// Allow access to a company
    Activate { code: String },
    /// Refuse all tenant operations for a company
    Deactivate { code: String },
    /// Point a company at a different database server or database
    Repoint {
        code: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        database: Option<String>,
    },
}

pub async fn run_cli(command: Command, context: &core::ArcContext, db: &core::DbContext) -> Result<(), CliError> {
    match command {
        Command::Migrate(command) => run_migrate(command, context, db).await,
        Command::Companies(command) => run_companies(command, context, db).await,
    }
}

async fn run_migrate(command: MigrateCommand, context: &core::ArcContext, db: &core::DbContext) -> Result<(), CliError> {
    match command {
        MigrateCommand::Create { name } => {
            let filename = app::create_migration(&name).map_err(|e| CliError::MigrationCreateFailed { source: e })?;
            println!("Created new migration file: {filename}");
        }
        MigrateCommand::List => {
            println!("Master migrations:");
            for (i, migration) in app::list_migrations().iter().enumerate() {
                println!("{}. {}", i + 1, migration);
            }
            println!("Tenant migrations:");
            for migration in app::TENANT_MIGRATIONS {
                println!("{}. {} ({})", migration.version, migration.description, &migration.checksum()[..12]);
            }
        }
        MigrateCommand::Status { company } => {
            match app::check_pending_migrations(db).await {
                Ok(true) => println!("Master: there are pending migrations that need to be applied."),
                Ok(false) => println!("Master: up to date."),
                Err(app::MigrationError::NoMigrationsApplied) => println!("Master: no migrations have been applied yet."),
                Err(e) => return Err(CliError::MigrationStatusCheckFailed { source: e }),
            }
            for code in target_companies(context, company.as_deref()).await? {
                let pending = match context.tenants.get_pool(&code).await {
                    Ok(tenant) => app::pending_migrations(&tenant).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match pending {
                    Ok(pending) if pending.is_empty() => println!("{code}: up to date."),
                    Ok(pending) => {
                        let versions = pending.iter().map(|m| m.version.to_string()).collect::<Vec<_>>();
                        println!("{code}: pending {}", versions.join(", "));
                    }
                    Err(e) => println!("{code}: {e}"),
                }
            }
        }
        MigrateCommand::Master => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Master migrations applied successfully.");
        }
        MigrateCommand::Tenants { company } => {
            let only = company.as_deref().map(CompanyCode::new);
            let outcomes = app::run_for_companies(&context.tenants, only.as_ref()).await?;
            let total = outcomes.len();
            let mut failed = 0;
            for (code, outcome) in outcomes {
                match outcome {
                    Ok(report) => println!("{code}: applied {:?}, skipped {:?}", report.applied, report.skipped),
                    Err(e) => {
                        failed += 1;
                        println!("{code}: FAILED: {e}");
                    }
                }
            }
            context.tenants.close_all().await;
            if failed > 0 {
                return Err(CliError::TenantMigrationsFailed { failed, total });
            }
            println!("Tenant migrations applied successfully to {total} companies.");
        }
    }
    Ok(())
}

async fn run_companies(command: CompanyCommand, context: &core::ArcContext, db: &core::DbContext) -> Result<(), CliError> {
    match command {
        CompanyCommand::List => {
            let companies = context.registry.list().await?;
            if companies.is_empty() {
                println!("No companies registered.");
            }
            for company in companies {
                let state = if company.active { "active" } else { "inactive" };
                println!("{:<12} {:<8} {}", company.company_code, state, company.name);
            }
        }
        CompanyCommand::Show { code } => {
            let code = CompanyCode::new(&code);
            let company = context
                .registry
                .find_by_code(&code)
                .await?
                .ok_or_else(|| CliError::CompanyNotFound(code.clone()))?;
            let descriptor = context.tenants.resolver().descriptor_for(&code, &company);
            println!("code:      {}", company.company_code);
            println!("name:      {}", company.name);
            println!("active:    {}", company.active);
            println!("database:  {descriptor}");
            println!("payroll:   {}", company.payroll_enable);
            println!("survey:    {}", company.show_survey);
            println!("feedback:  {}", company.show_feedback);
            println!("logo:      {}", company.has_logo);
        }
        CompanyCommand::Add { code, name, database, host, port, user, inactive } => {
            print!("Enter database password for company '{code}': ");
            io::stdout().flush().map_err(|e| CliError::PasswordPromptFailed { source: e })?;
            let password = rpassword::read_password().map_err(|e| CliError::PasswordPromptFailed { source: e })?;
            if password.trim().is_empty() {
                return Err(CliError::Other("Password cannot be empty".to_string()));
            }

            let company = db::insert_company(
                db,
                db::NewCompany {
                    company_code: code,
                    name,
                    database_name: database,
                    server_host: host,
                    server_port: port,
                    server_user: user,
                    server_password: Password::new(password),
                    active: !inactive,
                },
            )
            .await?;
            println!("Company '{}' registered.", company.company_code);
        }
        CompanyCommand::Activate { code } => set_active(context, db, &CompanyCode::new(&code), true).await?,
        CompanyCommand::Deactivate { code } => set_active(context, db, &CompanyCode::new(&code), false).await?,
        CompanyCommand::Repoint { code, host, port, database } => {
            let code = CompanyCode::new(&code);
            let update = db::ConnectionUpdate { server_host: host, server_port: port, database_name: database };
            if !db::update_connection(db, &code, update).await? {
                return Err(CliError::CompanyNotFound(code));
            }
            println!("Company '{code}' repointed.");
            print_recheck_note(context, &code);
        }
    }
    Ok(())
}

async fn set_active(context: &core::ArcContext, db: &core::DbContext, code: &CompanyCode, active: bool) -> Result<(), CliError> {
    if !db::set_active(db, code, active).await? {
        return Err(CliError::CompanyNotFound(code.clone()));
    }
    let state = if active { "activated" } else { "deactivated" };
    println!("Company '{code}' {state}.");
    print_recheck_note(context, code);
    Ok(())
}

// Pools live in the server process; it re-reads the registry on its own.
fn print_recheck_note(context: &core::ArcContext, code: &CompanyCode) {
    println!(
        "Running servers apply the change within {}s, or at once after DELETE /api/companies/{code}/pool.",
        context.settings.tenants.recheck_interval_secs
    );
}

async fn target_companies(context: &core::ArcContext, only: Option<&str>) -> Result<Vec<CompanyCode>, CliError> {
    if let Some(code) = only {
        return Ok(vec![CompanyCode::new(code)]);
    }
    Ok(context
        .registry
        .list()
        .await?
        .into_iter()
        .filter(|company| company.active)
        .map(|company| CompanyCode::new(&company.company_code))
        .collect())
}
