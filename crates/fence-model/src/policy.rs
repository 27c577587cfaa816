//! Isolation policy
//!
//! Declares which entity types are tenant-scoped. The policy is built once at
//! process start and never changes afterwards; an entity type missing from it
//! is never rewritten.

use crate::ids::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Field that carries the tenant predicate unless configured otherwise
pub const DEFAULT_TENANT_FIELD: &str = "tenantId";

/// Tenant-scoped entities of the visitor-management application
pub const VISITOR_MANAGEMENT_ENTITIES: &[&str] = &[
    "FirstTimer",
    "Church",
    "Form",
    "FormSubmission",
    "FollowUp",
    "ContactAttempt",
    "FoundationCourse",
    "FoundationClass",
    "FoundationEnrollment",
    "Department",
    "DepartmentEnrollment",
    "Notification",
    "VerificationCode",
];

/// Static isolation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationPolicy {
    isolated: BTreeSet<EntityType>,
    tenant_field: String,
}

impl IsolationPolicy {
    /// Create policy isolating the given entity types
    #[must_use]
    pub fn new<I, E>(entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityType>,
    {
        Self {
            isolated: entities.into_iter().map(Into::into).collect(),
            tenant_field: DEFAULT_TENANT_FIELD.to_string(),
        }
    }

    /// Built-in policy of the visitor-management application
    #[must_use]
    pub fn visitor_management() -> Self {
        Self::new(VISITOR_MANAGEMENT_ENTITIES.iter().copied())
    }

    /// Use a different tenant field name
    #[inline]
    #[must_use]
    pub fn with_tenant_field(mut self, field: impl Into<String>) -> Self {
        self.tenant_field = field.into();
        self
    }

    /// Whether the entity type is tenant-scoped
    #[inline]
    #[must_use]
    pub fn is_isolated(&self, entity: &EntityType) -> bool {
        self.isolated.contains(entity)
    }

    /// Name of the tenant field injected into predicates and payloads
    #[inline]
    #[must_use]
    pub fn tenant_field(&self) -> &str {
        &self.tenant_field
    }

    /// Isolated entity types, sorted
    pub fn isolated_entities(&self) -> impl Iterator<Item = &EntityType> {
        self.isolated.iter()
    }

    /// Number of isolated entity types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.isolated.len()
    }

    /// Whether no entity type is isolated
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.isolated.is_empty()
    }
}

impl Default for IsolationPolicy {
    /// The visitor-management policy
    fn default() -> Self {
        Self::visitor_management()
    }
}
