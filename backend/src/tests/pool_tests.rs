use std::sync::Arc;

use crate::cfg;
use crate::tenancy::{CompanyCode, SchemaDialect, TenantError, TenantPools};
use crate::tests::support::{FakeDirectory, company, tenant_settings};

fn pools(directory: &Arc<FakeDirectory>) -> TenantPools {
    TenantPools::new(directory.clone(), &tenant_settings())
}

/// Pools that ask the registry again on every access.
fn rechecking_pools(directory: &Arc<FakeDirectory>) -> TenantPools {
    let settings = cfg::TenantSettings { recheck_interval_secs: 0, ..tenant_settings() };
    TenantPools::new(directory.clone(), &settings)
}

#[tokio::test]
async fn test_second_get_pool_returns_cached_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = pools(&directory);

    let first = pools.get_pool(&CompanyCode::new("AILAB")).await.unwrap();
    let second = pools.get_pool(&CompanyCode::new("ailab")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(directory.lookups(), 1);
    assert_eq!(first.pool().size(), 0, "pool must connect lazily");
}

#[tokio::test]
async fn test_acme_pool_targets_loopback() {
    let directory = Arc::new(FakeDirectory::with(vec![company("ACME", true, "localhost", 5432, "acme_db")]));
    let pools = pools(&directory);

    let tenant = pools.get_pool(&CompanyCode::new("acme")).await.unwrap();

    let options = tenant.pool().connect_options();
    assert_eq!(options.get_host(), "127.0.0.1");
    assert_eq!(options.get_port(), 5432);
    assert_eq!(options.get_database(), Some("acme_db"));
    assert_eq!(options.get_username(), "hr_app");
    assert_eq!(tenant.code().as_str(), "ACME");
    assert_eq!(pools.cached_codes().await, vec![CompanyCode::new("ACME")]);
}

#[tokio::test]
async fn test_inactive_company_gets_no_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("OLDCO", false, "10.0.0.9", 5432, "oldco")]));
    let pools = pools(&directory);

    let result = pools.get_pool(&CompanyCode::new("OLDCO")).await;

    assert!(matches!(result, Err(TenantError::TenantInactive { .. })));
    assert!(pools.cached_codes().await.is_empty());
}

#[tokio::test]
async fn test_unknown_company_gets_no_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![]));
    let pools = pools(&directory);

    let result = pools.get_pool(&CompanyCode::new("GHOST")).await;

    assert!(matches!(result, Err(TenantError::TenantNotFound { .. })));
    assert!(pools.cached_codes().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_first_access_shares_one_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = pools(&directory);
    let code = CompanyCode::new("AILAB");

    let (a, b, c) = tokio::join!(pools.get_pool(&code), pools.get_pool(&code), pools.get_pool(&code));
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    // every caller missed the cache and resolved on its own
    assert_eq!(directory.lookups(), 3);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert!(!a.pool().is_closed());
    assert_eq!(pools.cached_codes().await.len(), 1);
    // the losing candidates are gone: only the callers and the cache hold the winner
    assert_eq!(Arc::strong_count(&a), 4);
}

#[tokio::test]
async fn test_cached_pool_is_trusted_within_recheck_interval() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    directory.set_active("AILAB", false);
    let second = pools.get_pool(&code).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(directory.lookups(), 1);
}

#[tokio::test]
async fn test_deactivated_company_is_refused_after_recheck() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = rechecking_pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    directory.set_active("ailab", false);
    let result = pools.get_pool(&code).await;

    assert!(matches!(result, Err(TenantError::TenantInactive { .. })));
    assert!(first.pool().is_closed());
    assert!(pools.cached_codes().await.is_empty());

    directory.set_active("ailab", true);
    let reactivated = pools.get_pool(&code).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &reactivated));
}

#[tokio::test]
async fn test_repointed_company_gets_new_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = rechecking_pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    directory.repoint("AILAB", "10.0.0.40", "ailab_hr_v2");
    let second = pools.get_pool(&code).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.pool().is_closed());
    assert_eq!(second.descriptor().host, "10.0.0.40");
    assert_eq!(second.descriptor().database, "ailab_hr_v2");
    assert_eq!(pools.cached_codes().await, vec![code]);
}

#[tokio::test]
async fn test_unchanged_company_keeps_pool_after_recheck() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = rechecking_pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    let second = pools.get_pool(&code).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.pool().is_closed());
    assert_eq!(directory.lookups(), 2);
}

#[tokio::test]
async fn test_registry_outage_keeps_cached_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = rechecking_pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    directory.set_unavailable(true);
    let second = pools.get_pool(&code).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.pool().is_closed());
}

#[tokio::test]
async fn test_invalidate_rebuilds_pool() {
    let directory = Arc::new(FakeDirectory::with(vec![company("AILAB", true, "10.0.0.12", 5432, "ailab_hr")]));
    let pools = pools(&directory);
    let code = CompanyCode::new("AILAB");

    let first = pools.get_pool(&code).await.unwrap();
    assert!(pools.invalidate(&code).await);
    assert!(!pools.invalidate(&code).await);
    let second = pools.get_pool(&code).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(first.pool().is_closed());
    assert_eq!(directory.lookups(), 2);
}

#[tokio::test]
async fn test_close_all_empties_cache() {
    let directory = Arc::new(FakeDirectory::with(vec![
        company("AILAB", true, "10.0.0.12", 5432, "ailab_hr"),
        company("ACME", true, "localhost", 5432, "acme_db"),
    ]));
    let pools = pools(&directory);

    let ailab = pools.get_pool(&CompanyCode::new("AILAB")).await.unwrap();
    pools.get_pool(&CompanyCode::new("ACME")).await.unwrap();
    assert_eq!(pools.cached_codes().await, vec![CompanyCode::new("ACME"), CompanyCode::new("AILAB")]);

    pools.close_all().await;

    assert!(pools.cached_codes().await.is_empty());
    assert!(ailab.pool().is_closed());
}

#[tokio::test]
async fn test_pool_carries_configured_dialect() {
    let directory = Arc::new(FakeDirectory::with(vec![
        company("AILAB", true, "10.0.0.12", 5432, "ailab_hr"),
        company("ACME", true, "localhost", 5432, "acme_db"),
    ]));
    let mut settings = tenant_settings();
    settings.dialects.insert("ailab".to_string(), SchemaDialect::Legacy);
    let pools = TenantPools::new(directory, &settings);

    let ailab = pools.get_pool(&CompanyCode::new("AILAB")).await.unwrap();
    let acme = pools.get_pool(&CompanyCode::new("ACME")).await.unwrap();

    assert_eq!(ailab.dialect(), SchemaDialect::Legacy);
    assert_eq!(acme.dialect(), SchemaDialect::Standard);
}

#[tokio::test]
async fn test_unreachable_database_surfaces_connection_error() {
    // nothing listens on port 1
    let directory = Arc::new(FakeDirectory::with(vec![company("DOWN", true, "127.0.0.1", 1, "down_db")]));
    let settings = cfg::TenantSettings { connect_timeout_secs: 1, ..tenant_settings() };
    let pools = TenantPools::new(directory, &settings);

    let tenant = pools.get_pool(&CompanyCode::new("DOWN")).await.unwrap();
    let error = tenant.ping().await.unwrap_err();

    assert!(matches!(error, TenantError::ConnectionError { .. }), "got {error:?}");
    assert!(error.to_string().contains("DOWN"));
}
