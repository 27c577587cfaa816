//! Rewrite errors
//!
//! A rejected call is never forwarded. Skipping the injection instead would
//! let an unscoped call reach storage.

use fence_model::{EntityType, ModelError};

/// Errors raised by the argument rewriter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// Call on an isolated entity cannot be scoped and is rejected
    #[error("policy violation on {entity}: {violation}")]
    PolicyViolation {
        /// Entity the call targeted
        entity: EntityType,
        /// What made the call unscopable
        violation: Violation,
    },

    /// Malformed call on a non-isolated entity
    #[error("invalid operation: {0}")]
    Model(#[from] ModelError),
}

impl RewriteError {
    /// Create policy violation for entity
    pub fn violation(entity: impl Into<EntityType>, violation: Violation) -> Self {
        Self::PolicyViolation {
            entity: entity.into(),
            violation,
        }
    }

    /// Check if error is a policy violation
    #[inline]
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. })
    }
}

/// Reasons a call on an isolated entity is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Bulk insert without rows
    #[error("createMany without a batch payload")]
    MissingBatch,

    /// Bulk insert whose batch is not a sequence
    #[error("createMany batch is {found}, expected an array")]
    BatchNotSequence {
        /// JSON type found instead
        found: &'static str,
    },

    /// Bulk insert containing a row that is not an object
    #[error("createMany batch element {index} is {found}, expected an object")]
    BatchElementNotRecord {
        /// Position in the batch
        index: usize,
        /// JSON type found instead
        found: &'static str,
    },

    /// Operation name outside the closed set of kinds
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}
