//! Error types for scoped data access
//!
//! Covers:
//! - Downstream storage failures (passed through unmodified)
//! - Scoped handle construction failures
//! - Calls rejected by the rewriter

use fence_model::{EntityType, OperationKind};
use fence_rewrite::RewriteError;

/// Errors reported by the underlying store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No row matched a single-row write
    #[error("record not found in {entity}")]
    NotFound {
        /// Entity the write targeted
        entity: EntityType,
    },

    /// Unique constraint violated
    #[error("unique constraint violated on {entity}.{field}")]
    UniqueViolation {
        /// Entity the write targeted
        entity: EntityType,
        /// Field holding the duplicate value
        field: String,
    },

    /// Store unreachable
    #[error("storage unavailable: {0}")]
    Connectivity(String),

    /// Arguments the store cannot execute
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Any other backend failure
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create not-found error for entity
    pub fn not_found(entity: impl Into<EntityType>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// Create unique violation error
    pub fn unique_violation(entity: impl Into<EntityType>, field: impl Into<String>) -> Self {
        Self::UniqueViolation {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

/// Failures building a scoped handle
///
/// A failed construction is never cached; the next `get` for the tenant
/// tries again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Tenant id the handle cannot be bound to
    #[error("invalid tenant id '{tenant}': {reason}")]
    InvalidTenant {
        /// Tenant id as given
        tenant: String,
        /// Why it was refused
        reason: &'static str,
    },

    /// Raw client cannot be wrapped for the policy
    #[error("raw client cannot be scoped: isolated entity {0} is unknown to the store")]
    UnknownEntity(EntityType),
}

/// Errors from a data-access call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Call rejected before reaching storage
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// Storage failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Store answered with the wrong output shape for the kind
    #[error("unexpected {found} output for {kind}")]
    UnexpectedOutput {
        /// Kind that was executed
        kind: OperationKind,
        /// Output variant received
        found: &'static str,
    },
}

impl ClientError {
    /// Check if the call was rejected by the isolation policy
    #[inline]
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::Rewrite(err) if err.is_policy_violation())
    }

    /// Underlying store error, if any
    #[inline]
    #[must_use]
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}
