//! Scoped client factory
//!
//! Binds the shared raw client to a tenant. Construction is cheap: the
//! handle holds the raw client and the policy by reference count.

use crate::client::DataClient;
use crate::error::CacheError;
use crate::handle::ScopedHandle;
use fence_model::{IsolationPolicy, TenantId};
use fence_rewrite::ArgumentRewriter;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Longest accepted tenant id, in bytes
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Builds [`ScopedHandle`]s over one raw client and one policy
#[derive(Debug, Clone)]
pub struct ScopedClientFactory {
    raw: Arc<dyn DataClient>,
    rewriter: ArgumentRewriter,
}

impl ScopedClientFactory {
    /// Create factory over a raw client
    #[must_use]
    pub fn new(raw: Arc<dyn DataClient>, policy: Arc<IsolationPolicy>) -> Self {
        Self {
            raw,
            rewriter: ArgumentRewriter::new(policy),
        }
    }

    /// Policy handles are built for
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        self.rewriter.policy()
    }

    /// The shared raw client
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn DataClient> {
        &self.raw
    }

    /// Check that a tenant id can be bound
    ///
    /// # Errors
    /// Returns `CacheError::InvalidTenant` if the id is blank, contains
    /// whitespace or is longer than [`MAX_TENANT_ID_LEN`] bytes
    pub fn validate_tenant(tenant: &TenantId) -> Result<(), CacheError> {
        let id = tenant.as_str();
        let reason = if id.trim().is_empty() {
            "blank"
        } else if id.chars().any(char::is_whitespace) {
            "contains whitespace"
        } else if id.len() > MAX_TENANT_ID_LEN {
            "longer than 128 bytes"
        } else {
            return Ok(());
        };

        Err(CacheError::InvalidTenant {
            tenant: id.to_string(),
            reason,
        })
    }

    /// Check that the raw client can serve every isolated entity
    ///
    /// A client without introspection (empty entity list) is accepted as is.
    ///
    /// # Errors
    /// Returns `CacheError::UnknownEntity` for the first isolated entity the
    /// raw client does not know
    pub fn check_wrappable(&self) -> Result<(), CacheError> {
        let known: BTreeSet<_> = self.raw.entity_types().into_iter().collect();
        if known.is_empty() {
            return Ok(());
        }

        match self.policy().isolated_entities().find(|e| !known.contains(*e)) {
            Some(missing) => Err(CacheError::UnknownEntity(missing.clone())),
            None => Ok(()),
        }
    }

    /// Build a handle bound to `tenant`
    ///
    /// # Errors
    /// Returns `CacheError` if the tenant id is invalid or the raw client
    /// cannot be scoped for the policy
    pub fn build(&self, tenant: &TenantId) -> Result<ScopedHandle, CacheError> {
        Self::validate_tenant(tenant)?;
        self.check_wrappable()?;

        tracing::debug!("Building scoped handle for tenant: {}", tenant);
        Ok(ScopedHandle::new(
            tenant.clone(),
            Arc::clone(&self.raw),
            self.rewriter.clone(),
        ))
    }
}
