//! Authenticated principal
//!
//! Produced by the authentication collaborator from verified token claims and
//! consumed read-only here. Field names follow the token claims (`sub`,
//! `tenantId`, `roleKeys`, `scope`), so claims deserialize directly.

use crate::ids::{SubjectId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identity and tenant binding of the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Authenticated subject
    #[serde(rename = "sub")]
    pub subject_id: SubjectId,
    /// Tenant every scoped call is bound to
    pub tenant_id: TenantId,
    /// Granted role keys
    #[serde(default)]
    pub role_keys: BTreeSet<String>,
    /// Optional organizational scope within the tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<PrincipalScope>,
}

impl Principal {
    /// Create principal without roles
    #[must_use]
    pub fn new(subject_id: impl Into<SubjectId>, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            subject_id: subject_id.into(),
            tenant_id: tenant_id.into(),
            role_keys: BTreeSet::new(),
            scope: None,
        }
    }

    /// With role keys
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_keys.extend(roles.into_iter().map(Into::into));
        self
    }

    /// With organizational scope
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: PrincipalScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Tenant binding
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Whether the principal holds the role
    #[inline]
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role_keys.contains(role)
    }

    /// Whether the principal holds at least one of the roles
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Organizational scope carried by a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalScope {
    /// Scope level
    #[serde(rename = "type")]
    pub kind: ScopeKind,
    /// Scope identifier
    pub id: String,
}

/// Organizational scope level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Group of groups
    Zone,
    /// Group of churches
    Group,
    /// Single church
    Church,
}
