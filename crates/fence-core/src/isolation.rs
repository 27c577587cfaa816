//! Per-request client selection

use crate::config::IsolationConfig;
use crate::error::ConfigError;
use async_trait::async_trait;
use fence_client::{
    CacheError, CacheStats, ClientError, DataClient, QueryOutput, ScopedClientCache,
    ScopedClientFactory, ScopedHandle,
};
use fence_model::{EntityType, IsolationPolicy, OperationDescriptor, Principal};
use std::sync::Arc;

/// Client a request handler must use
#[derive(Debug, Clone)]
pub enum RequestClient {
    /// Bound to the authenticated principal's tenant
    Scoped(Arc<ScopedHandle>),
    /// Raw client for anonymous requests
    Unscoped(Arc<dyn DataClient>),
}

impl RequestClient {
    /// Check if calls are tenant-scoped
    #[inline]
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped(_))
    }

    /// The scoped handle, if any
    #[inline]
    #[must_use]
    pub fn as_scoped(&self) -> Option<&Arc<ScopedHandle>> {
        match self {
            Self::Scoped(handle) => Some(handle),
            Self::Unscoped(_) => None,
        }
    }
}

#[async_trait]
impl DataClient for RequestClient {
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError> {
        match self {
            Self::Scoped(handle) => handle.execute(op).await,
            Self::Unscoped(raw) => raw.execute(op).await,
        }
    }

    fn entity_types(&self) -> Vec<EntityType> {
        match self {
            Self::Scoped(handle) => handle.entity_types(),
            Self::Unscoped(raw) => raw.entity_types(),
        }
    }
}

/// Tenant isolation for one raw client
///
/// Shared by every request; cloning is cheap.
#[derive(Debug, Clone)]
pub struct TenantIsolation {
    raw: Arc<dyn DataClient>,
    cache: ScopedClientCache,
}

impl TenantIsolation {
    /// Create from a validated configuration
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid
    pub fn new(raw: Arc<dyn DataClient>, config: &IsolationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = Arc::new(config.policy());

        tracing::info!(
            entities = policy.len(),
            tenant_field = policy.tenant_field(),
            capacity = config.cache.capacity,
            "Tenant isolation enabled"
        );
        let factory = ScopedClientFactory::new(Arc::clone(&raw), policy);
        Ok(Self {
            raw,
            cache: ScopedClientCache::new(factory, config.cache_settings()),
        })
    }

    /// Create with the built-in policy and default cache
    #[must_use]
    pub fn with_defaults(raw: Arc<dyn DataClient>) -> Self {
        let factory =
            ScopedClientFactory::new(Arc::clone(&raw), Arc::new(IsolationPolicy::default()));
        Self {
            raw,
            cache: ScopedClientCache::new(factory, IsolationConfig::default().cache_settings()),
        }
    }

    /// Client for a request
    ///
    /// Authenticated requests get the cached handle for their tenant.
    /// Anonymous requests get the raw client and never touch the cache.
    ///
    /// # Errors
    /// Returns `CacheError` if the tenant's handle cannot be built
    pub async fn client_for(&self, principal: Option<&Principal>) -> Result<RequestClient, CacheError> {
        match principal {
            Some(principal) => {
                let handle = self.cache.get(principal.tenant_id()).await?;
                tracing::trace!(
                    tenant = %principal.tenant_id(),
                    subject = %principal.subject_id,
                    "Scoped client selected"
                );
                Ok(RequestClient::Scoped(handle))
            }
            None => Ok(RequestClient::Unscoped(Arc::clone(&self.raw))),
        }
    }

    /// Policy enforced for authenticated requests
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        self.cache.policy()
    }

    /// The per-tenant handle cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ScopedClientCache {
        &self.cache
    }

    /// Cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
