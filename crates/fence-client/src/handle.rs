//! Tenant-bound data-access handle

use crate::client::{DataClient, QueryOutput};
use crate::error::ClientError;
use async_trait::async_trait;
use fence_model::{EntityType, IsolationPolicy, OperationDescriptor, TenantId};
use fence_rewrite::{ArgumentRewriter, RewriteError};
use std::sync::Arc;

/// A raw client bound to one tenant
///
/// Every call is passed through the [`ArgumentRewriter`] with the bound
/// tenant before it reaches the raw client. The raw client itself is shared
/// and never modified, and it is not reachable through the handle.
#[derive(Debug, Clone)]
pub struct ScopedHandle {
    tenant: TenantId,
    raw: Arc<dyn DataClient>,
    rewriter: ArgumentRewriter,
}

impl ScopedHandle {
    pub(crate) fn new(tenant: TenantId, raw: Arc<dyn DataClient>, rewriter: ArgumentRewriter) -> Self {
        Self {
            tenant,
            raw,
            rewriter,
        }
    }

    /// Tenant this handle is bound to
    #[inline]
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Policy enforced by this handle
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        self.rewriter.policy()
    }

    /// The descriptor that would reach storage for `op`
    ///
    /// # Errors
    /// Returns `RewriteError::PolicyViolation` for a call that cannot be scoped
    pub fn preview(&self, op: OperationDescriptor) -> Result<OperationDescriptor, RewriteError> {
        self.rewriter.rewrite(&self.tenant, op)
    }
}

#[async_trait]
impl DataClient for ScopedHandle {
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError> {
        let scoped = self.rewriter.rewrite(&self.tenant, op)?;
        self.raw.execute(scoped).await
    }

    fn entity_types(&self) -> Vec<EntityType> {
        self.raw.entity_types()
    }
}
