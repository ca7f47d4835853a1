#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[tokio::main]
async fn main() {
    app::run().await;
}


pub mod cfg {
    mod app_settings;
    mod database_settings;
    mod server_settings;
    mod tenant_settings;

    pub use app_settings::*;
    pub use database_settings::*;
    pub use server_settings::*;
    pub use tenant_settings::*;
}

pub mod core {
    mod context;
    mod dberror;
    mod dbpool;

    pub use context::*;
    pub use dberror::*;
    pub use dbpool::*;
}

pub mod tenancy {
    mod company_code;
    mod descriptor;
    mod dialect;
    mod directory;
    mod errors;
    mod pools;
    mod resolver;

    pub use company_code::*;
    pub use descriptor::*;
    pub use dialect::*;
    pub use directory::*;
    pub use errors::*;
    pub use pools::*;
    pub use resolver::*;
}

pub mod db {
    mod companies;

    pub mod audit_logs;
    pub mod employees;

    pub use audit_logs::{AuditLog, AuditStatus, NewAuditLog};
    pub use companies::*;
    pub use employees::Employee;
}

pub mod routes {
    pub mod companies;
    pub mod employees;
    pub mod health;
}

pub mod app {
    mod cli;
    mod migrations;
    mod router;
    mod server;
    mod tenant_migrations;

    pub use cli::*;
    pub use migrations::*;
    pub use router::*;
    pub use server::*;
    pub use tenant_migrations::*;
}
