use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::core;
use crate::routes;

/// Back end server: company-scoped API routes plus the public health check
pub fn create_router(context: core::ArcContext) -> Router {
    let company_routes = Router::new()
        .route("/api/companies/{code}/status", get(routes::companies::status)) // flags, also for inactive companies
        .route("/api/companies/{code}/logo", get(routes::companies::logo))
        .route("/api/companies/{code}/ping", get(routes::companies::ping)) // round-trip to the company database
        .route("/api/companies/{code}/pool", delete(routes::companies::drop_pool))
        .route("/api/pools", get(routes::companies::cached_pools))
        .route("/api/companies/{code}/employees/{emp_no}", get(routes::employees::get_employee))
        .route(
            "/api/companies/{code}/employees/{emp_no}/audit-logs",
            get(routes::employees::list_audit_logs),
        )
        .route("/api/companies/{code}/audit-logs", post(routes::employees::record_audit_log))
        .with_state(context.clone());

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .with_state(context);

    Router::new()
        .merge(company_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
}
