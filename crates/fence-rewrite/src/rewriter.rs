//! Argument rewriter
//!
//! Given a tenant and a descriptor, produces the descriptor that actually
//! reaches storage. One handler per [`RewriteShape`]:
//!
//! | shape | handler |
//! |---|---|
//! | `Passthrough` | none |
//! | `TenantFiltered` | set tenant in `filter`; guard `payload` |
//! | `TenantInjected` | set tenant in `payload` |
//! | `BatchInjected` | set tenant in every row of `batch_payload` |
//! | `FilterAndInject` | set tenant in `filter` and `payload`; guard `update` |
//!
//! "Set" always overwrites a caller-supplied tenant. "Guard" overwrites the
//! tenant field only where the caller wrote one, so update data cannot move a
//! row into another tenant.

use crate::error::{RewriteError, Violation};
use crate::shape::{classify, RewriteShape};
use fence_model::{
    json_type_name, EntityType, IsolationPolicy, OperationDescriptor, OperationKind, Principal,
    Record, TenantId,
};
use serde_json::Value;
use std::sync::Arc;

/// Pure, deterministic tenant rewriter
#[derive(Debug, Clone)]
pub struct ArgumentRewriter {
    policy: Arc<IsolationPolicy>,
}

impl ArgumentRewriter {
    /// Create rewriter for a policy
    #[inline]
    #[must_use]
    pub fn new(policy: Arc<IsolationPolicy>) -> Self {
        Self { policy }
    }

    /// Policy this rewriter enforces
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IsolationPolicy {
        &self.policy
    }

    /// Shared handle to the policy
    #[inline]
    #[must_use]
    pub fn policy_arc(&self) -> &Arc<IsolationPolicy> {
        &self.policy
    }

    /// Shape the call would be rewritten with
    #[inline]
    #[must_use]
    pub fn classify(&self, entity: &EntityType, kind: OperationKind) -> RewriteShape {
        classify(&self.policy, entity, kind)
    }

    /// Resolve an operation name for an entity
    ///
    /// # Errors
    /// - `RewriteError::PolicyViolation` if the name is unknown and the
    ///   entity is isolated
    /// - `RewriteError::Model` if the name is unknown otherwise
    pub fn resolve_kind(&self, entity: &EntityType, name: &str) -> Result<OperationKind, RewriteError> {
        name.parse::<OperationKind>().map_err(|err| {
            if self.policy.is_isolated(entity) {
                tracing::warn!(entity = %entity, operation = name, "rejected unknown operation");
                RewriteError::violation(entity.clone(), Violation::UnknownOperation(name.to_string()))
            } else {
                RewriteError::Model(err)
            }
        })
    }

    /// Rewrite on behalf of a principal
    ///
    /// # Errors
    /// See [`ArgumentRewriter::rewrite`]
    #[inline]
    pub fn rewrite_for(
        &self,
        principal: &Principal,
        op: OperationDescriptor,
    ) -> Result<OperationDescriptor, RewriteError> {
        self.rewrite(principal.tenant_id(), op)
    }

    /// Rewrite a descriptor for a tenant
    ///
    /// Non-isolated entities come back unchanged.
    ///
    /// # Errors
    /// - `RewriteError::PolicyViolation` if a `CreateMany` batch is missing,
    ///   not an array, or holds a non-object row
    pub fn rewrite(
        &self,
        tenant: &TenantId,
        mut op: OperationDescriptor,
    ) -> Result<OperationDescriptor, RewriteError> {
        let shape = self.classify(&op.entity, op.kind);
        let field = self.policy.tenant_field();
        let tenant_value = Value::String(tenant.as_str().to_owned());

        match shape {
            RewriteShape::Passthrough => {}
            RewriteShape::TenantFiltered => {
                set_tenant(op.filter.get_or_insert_with(Record::new), field, &tenant_value);
                if let Some(data) = op.payload.as_mut() {
                    guard_tenant(data, field, &tenant_value);
                }
            }
            RewriteShape::TenantInjected => {
                set_tenant(op.payload.get_or_insert_with(Record::new), field, &tenant_value);
            }
            RewriteShape::BatchInjected => {
                if let Err(err) = inject_batch(&op.entity, op.batch_payload.as_mut(), field, &tenant_value) {
                    tracing::warn!(entity = %op.entity, tenant = %tenant, error = %err, "rejected batch insert");
                    return Err(err);
                }
            }
            RewriteShape::FilterAndInject => {
                set_tenant(op.filter.get_or_insert_with(Record::new), field, &tenant_value);
                set_tenant(op.payload.get_or_insert_with(Record::new), field, &tenant_value);
                if let Some(update) = op.update.as_mut() {
                    guard_tenant(update, field, &tenant_value);
                }
            }
        }

        tracing::trace!(
            entity = %op.entity,
            kind = %op.kind,
            tenant = %tenant,
            shape = %shape,
            "rewrote operation"
        );
        Ok(op)
    }
}

fn set_tenant(record: &mut Record, field: &str, tenant: &Value) {
    record.insert(field.to_owned(), tenant.clone());
}

fn guard_tenant(record: &mut Record, field: &str, tenant: &Value) {
    if let Some(existing) = record.get_mut(field) {
        *existing = tenant.clone();
    }
}

fn inject_batch(
    entity: &EntityType,
    batch: Option<&mut Value>,
    field: &str,
    tenant: &Value,
) -> Result<(), RewriteError> {
    let batch = batch.ok_or_else(|| RewriteError::violation(entity.clone(), Violation::MissingBatch))?;

    let rows = match batch {
        Value::Array(rows) => rows,
        other => {
            return Err(RewriteError::violation(
                entity.clone(),
                Violation::BatchNotSequence {
                    found: json_type_name(other),
                },
            ))
        }
    };

    // Validate every row before touching any, so a rejected batch is left as it was.
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| !row.is_object()) {
        return Err(RewriteError::violation(
            entity.clone(),
            Violation::BatchElementNotRecord {
                index,
                found: json_type_name(row),
            },
        ));
    }

    for row in rows.iter_mut() {
        if let Value::Object(record) = row {
            set_tenant(record, field, tenant);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fence_model::to_record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        to_record(value).unwrap()
    }

    fn rewriter() -> ArgumentRewriter {
        ArgumentRewriter::new(Arc::new(IsolationPolicy::new(["Visitor"])))
    }

    fn t1() -> TenantId {
        TenantId::from("T1")
    }

    #[test]
    fn read_many_overwrites_caller_tenant() {
        let op = OperationDescriptor::find_many("Visitor", rec(json!({ "tenantId": "T2", "status": "NEW" })));

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.filter, Some(rec(json!({ "tenantId": "T1", "status": "NEW" }))));
    }

    #[test]
    fn create_injects_into_payload() {
        let op = OperationDescriptor::create("Visitor", rec(json!({ "fullName": "Jane" })));

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.payload, Some(rec(json!({ "fullName": "Jane", "tenantId": "T1" }))));
        assert_eq!(out.filter, None);
    }

    #[test]
    fn create_many_injects_every_row() {
        let op = OperationDescriptor::create_many(
            "Visitor",
            vec![
                rec(json!({ "fullName": "A" })),
                rec(json!({ "fullName": "B", "tenantId": "T9" })),
            ],
        );

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(
            out.batch_payload,
            Some(json!([
                { "fullName": "A", "tenantId": "T1" },
                { "fullName": "B", "tenantId": "T1" }
            ]))
        );
    }

    #[test]
    fn non_isolated_entity_is_untouched() {
        let op = OperationDescriptor::find_many("RoleCatalog", rec(json!({ "key": "admin" })));

        let out = rewriter().rewrite(&t1(), op.clone()).unwrap();

        assert_eq!(out, op);
    }

    #[test]
    fn missing_filter_still_scoped() {
        let op = OperationDescriptor::new("Visitor", OperationKind::DeleteMany);

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.filter, Some(rec(json!({ "tenantId": "T1" }))));
    }

    #[test]
    fn missing_create_payload_gets_tenant() {
        let op = OperationDescriptor::new("Visitor", OperationKind::Create);

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.payload, Some(rec(json!({ "tenantId": "T1" }))));
    }

    #[test]
    fn upsert_scopes_filter_and_create_branch() {
        let op = OperationDescriptor::upsert(
            "Visitor",
            rec(json!({ "phone": "555" })),
            rec(json!({ "phone": "555", "tenantId": "T2" })),
            rec(json!({ "status": "RETURNING" })),
        );

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.filter, Some(rec(json!({ "phone": "555", "tenantId": "T1" }))));
        assert_eq!(out.payload, Some(rec(json!({ "phone": "555", "tenantId": "T1" }))));
        assert_eq!(out.update, Some(rec(json!({ "status": "RETURNING" }))));
    }

    #[test]
    fn upsert_update_branch_cannot_move_tenant() {
        let op = OperationDescriptor::upsert(
            "Visitor",
            rec(json!({ "id": "v1" })),
            rec(json!({})),
            rec(json!({ "tenantId": "T2" })),
        );

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.update, Some(rec(json!({ "tenantId": "T1" }))));
    }

    #[test]
    fn update_data_cannot_move_tenant() {
        let op = OperationDescriptor::update_many(
            "Visitor",
            rec(json!({ "status": "NEW" })),
            rec(json!({ "status": "CONTACTED", "tenantId": "T2" })),
        );

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.filter, Some(rec(json!({ "status": "NEW", "tenantId": "T1" }))));
        assert_eq!(out.payload, Some(rec(json!({ "status": "CONTACTED", "tenantId": "T1" }))));
    }

    #[test]
    fn update_data_without_tenant_is_not_extended() {
        let op = OperationDescriptor::update(
            "Visitor",
            rec(json!({ "id": "v1" })),
            rec(json!({ "status": "CONTACTED" })),
        );

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.payload, Some(rec(json!({ "status": "CONTACTED" }))));
    }

    #[test]
    fn options_are_never_rewritten() {
        let op = OperationDescriptor::find_many("Visitor", Record::new())
            .with_option("take", json!(10))
            .with_option("tenantId", json!("T2"));

        let out = rewriter().rewrite(&t1(), op).unwrap();

        assert_eq!(out.options["tenantId"], json!("T2"));
        assert_eq!(out.options["take"], json!(10));
    }

    #[test]
    fn batch_not_sequence_is_rejected() {
        let op = OperationDescriptor::new("Visitor", OperationKind::CreateMany)
            .with_batch(json!({ "fullName": "A" }));

        let err = rewriter().rewrite(&t1(), op).unwrap_err();

        assert_eq!(
            err,
            RewriteError::violation("Visitor", Violation::BatchNotSequence { found: "object" })
        );
    }

    #[test]
    fn batch_with_scalar_row_is_rejected() {
        let op = OperationDescriptor::new("Visitor", OperationKind::CreateMany)
            .with_batch(json!([{ "fullName": "A" }, 42]));

        let err = rewriter().rewrite(&t1(), op).unwrap_err();

        assert_eq!(
            err,
            RewriteError::violation(
                "Visitor",
                Violation::BatchElementNotRecord { index: 1, found: "number" }
            )
        );
    }

    #[test]
    fn missing_batch_is_rejected() {
        let op = OperationDescriptor::new("Visitor", OperationKind::CreateMany);

        let err = rewriter().rewrite(&t1(), op).unwrap_err();

        assert_eq!(err, RewriteError::violation("Visitor", Violation::MissingBatch));
    }

    #[test]
    fn malformed_batch_on_open_entity_passes_through() {
        let op = OperationDescriptor::new("RoleCatalog", OperationKind::CreateMany).with_batch(json!("x"));

        assert!(rewriter().rewrite(&t1(), op).is_ok());
    }

    #[test]
    fn custom_tenant_field() {
        let policy = IsolationPolicy::new(["Visitor"]).with_tenant_field("orgId");
        let rewriter = ArgumentRewriter::new(Arc::new(policy));
        let op = OperationDescriptor::count("Visitor", rec(json!({ "tenantId": "T2" })));

        let out = rewriter.rewrite(&t1(), op).unwrap();

        assert_eq!(out.filter, Some(rec(json!({ "tenantId": "T2", "orgId": "T1" }))));
    }

    #[test]
    fn rewrite_for_uses_principal_tenant() {
        let principal = Principal::new("u-1", "T7");
        let op = OperationDescriptor::find_first("Visitor", Record::new());

        let out = rewriter().rewrite_for(&principal, op).unwrap();

        assert_eq!(out.filter.unwrap()["tenantId"], json!("T7"));
    }

    #[test]
    fn unknown_operation_on_isolated_entity() {
        let err = rewriter()
            .resolve_kind(&"Visitor".into(), "truncate")
            .unwrap_err();
        assert!(err.is_policy_violation());

        let err = rewriter()
            .resolve_kind(&"RoleCatalog".into(), "truncate")
            .unwrap_err();
        assert!(!err.is_policy_violation());

        assert_eq!(
            rewriter().resolve_kind(&"Visitor".into(), "findUnique").unwrap(),
            OperationKind::ReadOne
        );
    }
}
