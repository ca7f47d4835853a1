use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;

use crate::cfg;
use crate::tenancy::{
    CompanyCode, CompanyDirectory, ConnectionDefaults, ConnectionDescriptor, DialectMap, SchemaDialect,
    TenantError, TenantResolver,
};

/// Connection pool of one company database together with what we know about it.
pub struct TenantPool {
    code: CompanyCode,
    descriptor: ConnectionDescriptor,
    dialect: SchemaDialect,
    pool: PgPool,
}

impl TenantPool {
    #[must_use]
    pub fn new(code: CompanyCode, descriptor: ConnectionDescriptor, dialect: SchemaDialect, pool: PgPool) -> Self {
        Self { code, descriptor, dialect, pool }
    }

    #[must_use]
    pub const fn code(&self) -> &CompanyCode {
        &self.code
    }

    #[must_use]
    pub const fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Classifies a failure of a statement run against this pool.
    #[must_use]
    pub fn error(&self, source: sqlx::Error) -> TenantError {
        TenantError::from_sqlx(&self.code, source)
    }

    /// Runs `SELECT 1`; the first call is what actually opens a connection.
    pub async fn ping(&self) -> Result<(), TenantError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.error(e))?;
        Ok(())
    }
}

struct CachedPool {
    pool: Arc<TenantPool>,
    checked_at: Instant,
}

/// Process-wide cache holding at most one pool per company.
///
/// Pools are created lazily on first use. A cached pool is trusted for
/// `recheck_interval`; after that the next access asks the registry again, so
/// deactivating or repointing a company reaches a running server without a
/// restart.
pub struct TenantPools {
    resolver: TenantResolver,
    dialects: DialectMap,
    settings: cfg::TenantSettings,
    cache: RwLock<HashMap<CompanyCode, CachedPool>>,
}

impl TenantPools {
    #[must_use]
    pub fn new(directory: Arc<dyn CompanyDirectory>, settings: &cfg::TenantSettings) -> Self {
        Self {
            resolver: TenantResolver::new(directory, ConnectionDefaults::from(settings)),
            dialects: DialectMap::from_settings(&settings.dialects),
            settings: settings.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// Returns the cached pool for `code`, creating it on first access.
    ///
    /// Unknown and inactive companies never get a pool.
    pub async fn get_pool(&self, code: &CompanyCode) -> Result<Arc<TenantPool>, TenantError> {
        let cached = self
            .cache
            .read()
            .await
            .get(code)
            .map(|entry| (Arc::clone(&entry.pool), entry.checked_at));

        match cached {
            Some((pool, checked_at)) if checked_at.elapsed() < self.settings.recheck_interval() => Ok(pool),
            Some((pool, _)) => self.revalidate(code, pool).await,
            None => {
                let descriptor = self.resolver.resolve(code).await?;
                Ok(self.insert(code, descriptor).await)
            }
        }
    }

    /// Drops the cached pool of one company, e.g. after its registry row was repointed.
    pub async fn invalidate(&self, code: &CompanyCode) -> bool {
        let removed = self.cache.write().await.remove(code);
        match removed {
            Some(entry) => {
                entry.pool.pool.close().await;
                tracing::info!(company_code = %code, "Invalidated connection pool for company");
                true
            }
            None => false,
        }
    }

    pub async fn cached_codes(&self) -> Vec<CompanyCode> {
        let mut codes = self.cache.read().await.keys().cloned().collect::<Vec<_>>();
        codes.sort();
        codes
    }

    pub async fn close_all(&self) {
        let pools = self.cache.write().await.drain().map(|(_, entry)| entry.pool).collect::<Vec<_>>();
        for pool in &pools {
            pool.pool.close().await;
        }
        tracing::info!(count = pools.len(), "Closed company connection pools");
    }

    /// Stores a pool for `descriptor` unless another task got there first.
    async fn insert(&self, code: &CompanyCode, descriptor: ConnectionDescriptor) -> Arc<TenantPool> {
        let candidate = Arc::new(self.build_pool(code, descriptor));

        // Another task may have filled the slot while we were resolving; keep theirs.
        let (pool, discarded) = match self.cache.write().await.entry(code.clone()) {
            Entry::Occupied(entry) => (Arc::clone(&entry.get().pool), Some(candidate)),
            Entry::Vacant(entry) => {
                tracing::info!(
                    company_code = %code,
                    database = %candidate.descriptor,
                    dialect = ?candidate.dialect,
                    "Created connection pool for company"
                );
                let entry = entry.insert(CachedPool { pool: candidate, checked_at: Instant::now() });
                (Arc::clone(&entry.pool), None)
            }
        };

        if let Some(discarded) = discarded {
            tracing::debug!(company_code = %code, "Discarding duplicate pool from concurrent first access");
            discarded.pool.close().await;
        }

        pool
    }

    /// Asks the registry again about a company whose pool is past its recheck interval.
    async fn revalidate(&self, code: &CompanyCode, cached: Arc<TenantPool>) -> Result<Arc<TenantPool>, TenantError> {
        let descriptor = match self.resolver.resolve(code).await {
            Ok(descriptor) => descriptor,
            // Keep serving known-good pools while the master database is down.
            Err(TenantError::RegistryUnavailable { source, .. }) => {
                tracing::warn!(company_code = %code, error_message = %source, "Registry unavailable, keeping cached pool");
                return Ok(cached);
            }
            Err(error) => {
                self.evict(code, &cached).await;
                return Err(error);
            }
        };

        if descriptor == cached.descriptor {
            let mut cache = self.cache.write().await;
            if let Some(entry) = cache.get_mut(code).filter(|entry| Arc::ptr_eq(&entry.pool, &cached)) {
                entry.checked_at = Instant::now();
            }
            drop(cache);
            return Ok(cached);
        }

        tracing::info!(
            company_code = %code,
            from = %cached.descriptor,
            to = %descriptor,
            "Company database moved, replacing pool"
        );
        self.evict(code, &cached).await;
        Ok(self.insert(code, descriptor).await)
    }

    /// Removes `stale` from the cache unless it was already replaced, then closes it.
    async fn evict(&self, code: &CompanyCode, stale: &Arc<TenantPool>) {
        {
            let mut cache = self.cache.write().await;
            if cache.get(code).is_some_and(|entry| Arc::ptr_eq(&entry.pool, stale)) {
                cache.remove(code);
            }
        }
        stale.pool.close().await;
        tracing::info!(company_code = %code, "Evicted connection pool for company");
    }

    fn build_pool(&self, code: &CompanyCode, descriptor: ConnectionDescriptor) -> TenantPool {
        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .min_connections(self.settings.min_connections)
            .acquire_timeout(self.settings.connect_timeout())
            .idle_timeout(self.settings.idle_timeout())
            .connect_lazy_with(descriptor.connect_options());

        TenantPool::new(code.clone(), descriptor, self.dialects.dialect_for(code), pool)
    }
}
