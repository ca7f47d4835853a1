use std::sync::Arc;

use crate::cfg;
use crate::tenancy::{CompanyCode, ConnectionDefaults, TenantError, TenantResolver};
use crate::tests::support::{FakeDirectory, bare_company, company, tenant_settings};

fn resolver(directory: &Arc<FakeDirectory>) -> TenantResolver {
    TenantResolver::new(directory.clone(), ConnectionDefaults::from(&tenant_settings()))
}

#[tokio::test]
async fn test_resolve_active_company() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5433, "ailab_hr")]));

    let descriptor = resolver(&directory).resolve(&CompanyCode::new("AILAB")).await.unwrap();

    assert_eq!(descriptor.host, "10.0.0.12");
    assert_eq!(descriptor.port, 5433);
    assert_eq!(descriptor.user, "hr_app");
    assert_eq!(descriptor.password.expose(), "s3cret");
    assert_eq!(descriptor.database, "ailab_hr");
}

#[tokio::test]
async fn test_resolve_is_case_insensitive() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));

    let descriptor = resolver(&directory).resolve(&CompanyCode::new("  ailab ")).await.unwrap();

    assert_eq!(descriptor.database, "ailab_hr");
}

#[tokio::test]
async fn test_resolve_unknown_company() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));

    let result = resolver(&directory).resolve(&CompanyCode::new("NOPE")).await;

    assert!(matches!(result, Err(TenantError::TenantNotFound { code }) if code.as_str() == "NOPE"));
}

#[tokio::test]
async fn test_resolve_blank_code_skips_registry() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));

    let result = resolver(&directory).resolve(&CompanyCode::new("   ")).await;

    assert!(matches!(result, Err(TenantError::TenantNotFound { .. })));
    assert_eq!(directory.lookups(), 0);
}

#[tokio::test]
async fn test_resolve_inactive_company() {
    let directory = Arc::new(FakeDirectory::with(vec![company("OLDCO", false, "10.0.0.9", 5432, "oldco")]));

    let result = resolver(&directory).resolve(&CompanyCode::new("OLDCO")).await;

    assert!(matches!(result, Err(TenantError::TenantInactive { code }) if code.as_str() == "OLDCO"));
}

#[tokio::test]
async fn test_localhost_is_normalized_to_loopback() {
    let directory = Arc::new(FakeDirectory::with(vec![
        company("LOCAL", true, "localhost", 5432, "local_db"),
        company("UPPER", true, "LocalHost", 5432, "upper_db"),
    ]));
    let resolver = resolver(&directory);

    for code in ["local", "upper"] {
        let descriptor = resolver.resolve(&CompanyCode::new(code)).await.unwrap();
        assert_eq!(descriptor.host, "127.0.0.1");
        assert!(!descriptor.connect_options().get_host().eq_ignore_ascii_case("localhost"));
    }
}

#[tokio::test]
async fn test_missing_fields_get_defaults() {
    let directory = Arc::new(FakeDirectory::with(vec![bare_company("Bare")]));

    let descriptor = resolver(&directory).resolve(&CompanyCode::new("bare")).await.unwrap();

    assert_eq!(descriptor.host, "127.0.0.1");
    assert_eq!(descriptor.port, 5432);
    assert_eq!(descriptor.user, "postgres");
    assert_eq!(descriptor.password.expose(), "");
    assert_eq!(descriptor.database, "bare");
}

#[tokio::test]
async fn test_out_of_range_port_falls_back_to_default() {
    let directory = Arc::new(FakeDirectory::with(vec![company("WIDE", true, "10.0.0.1", 70_000, "wide")]));

    let descriptor = resolver(&directory).resolve(&CompanyCode::new("WIDE")).await.unwrap();

    assert_eq!(descriptor.port, 5432);
}

#[tokio::test]
async fn test_registry_failure_names_company() {
    let directory = Arc::new(FakeDirectory::unavailable());

    let error = resolver(&directory).resolve(&CompanyCode::new("acme")).await.unwrap_err();

    assert!(matches!(error, TenantError::RegistryUnavailable { .. }));
    assert!(error.to_string().contains("ACME"));
}

#[tokio::test]
async fn test_status_is_served_for_inactive_company() {
    let directory = Arc::new(FakeDirectory::with(vec![company("OLDCO", false, "10.0.0.9", 5432, "oldco")]));

    let status = resolver(&directory).status(&CompanyCode::new("oldco")).await.unwrap();

    assert_eq!(status.code.as_str(), "OLDCO");
    assert!(!status.active);
    assert!(status.payroll_enable);
    assert!(status.show_feedback);
}

#[tokio::test]
async fn test_descriptor_debug_hides_password() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));

    let descriptor = resolver(&directory).resolve(&CompanyCode::new("AILAB")).await.unwrap();

    let debug = format!("{descriptor:?}");
    assert!(!debug.contains("s3cret"));
    assert_eq!(descriptor.to_string(), "hr_app@10.0.0.12:5432/ailab_hr");
}

#[test]
fn test_localhost_is_rejected_as_loopback_literal() {
    for host in ["localhost", "LocalHost", " localhost ", ""] {
        let settings = cfg::TenantSettings { loopback_host: host.to_string(), ..tenant_settings() };
        let error = settings.validate().unwrap_err();
        assert!(error.to_string().contains("loopback_host"), "`{host}` accepted");
    }

    assert!(tenant_settings().validate().is_ok());
    let ipv6 = cfg::TenantSettings { loopback_host: "::1".to_string(), ..tenant_settings() };
    assert!(ipv6.validate().is_ok());
}
