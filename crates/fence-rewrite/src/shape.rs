//! Rewrite shapes
//!
//! Every call is classified once from `(isolated?, kind)` into the shape of
//! the rewrite it needs. The table is an exhaustive match, so adding a kind
//! without deciding its shape does not compile.

use fence_model::{EntityType, IsolationPolicy, OperationKind};
use std::fmt;

/// How a call is scoped to a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteShape {
    /// Entity not isolated: forwarded untouched
    Passthrough,
    /// Tenant written into the match predicate
    TenantFiltered,
    /// Tenant written into the single write payload
    TenantInjected,
    /// Tenant written into every row of the batch
    BatchInjected,
    /// Tenant written into the predicate and the create-branch (upsert)
    FilterAndInject,
}

impl RewriteShape {
    /// Short name for diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "unscoped-passthrough",
            Self::TenantFiltered => "tenant-filtered",
            Self::TenantInjected => "tenant-injected",
            Self::BatchInjected => "batch-injected",
            Self::FilterAndInject => "filter-and-inject",
        }
    }
}

impl fmt::Display for RewriteShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape a kind takes on an isolated entity
#[must_use]
pub const fn isolated_shape(kind: OperationKind) -> RewriteShape {
    match kind {
        OperationKind::ReadMany
        | OperationKind::ReadOne
        | OperationKind::Count
        | OperationKind::Aggregate
        | OperationKind::GroupBy
        | OperationKind::Update
        | OperationKind::UpdateMany
        | OperationKind::Delete
        | OperationKind::DeleteMany => RewriteShape::TenantFiltered,
        OperationKind::Create => RewriteShape::TenantInjected,
        OperationKind::CreateMany => RewriteShape::BatchInjected,
        OperationKind::Upsert => RewriteShape::FilterAndInject,
    }
}

/// Classify a call against the policy
#[must_use]
pub fn classify(policy: &IsolationPolicy, entity: &EntityType, kind: OperationKind) -> RewriteShape {
    if policy.is_isolated(entity) {
        isolated_shape(kind)
    } else {
        RewriteShape::Passthrough
    }
}
