//! Testing utilities for the tenant fence workspace
//!
//! Shared test helpers, fixtures, and a recording client.

#![allow(missing_docs)]

use async_trait::async_trait;
use fence_client::{ClientError, DataClient, QueryOutput};
use fence_model::{
    to_record, EntityType, IsolationPolicy, OperationDescriptor, OperationKind, Principal,
    PrincipalScope, Record, ScopeKind, TenantId,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Build a record from a `json!` object literal.
pub fn rec(value: Value) -> Record {
    to_record(value).unwrap()
}

pub fn tenant(id: &str) -> TenantId {
    TenantId::from(id)
}

pub fn principal(tenant_id: &str) -> Principal {
    Principal::new(format!("user-{tenant_id}"), tenant_id)
}

pub fn admin_principal(tenant_id: &str) -> Principal {
    principal(tenant_id)
        .with_roles(["admin"])
        .with_scope(PrincipalScope {
            kind: ScopeKind::Church,
            id: format!("church-{tenant_id}"),
        })
}

pub fn visitor_policy() -> Arc<IsolationPolicy> {
    Arc::new(IsolationPolicy::visitor_management())
}

pub fn small_policy() -> Arc<IsolationPolicy> {
    Arc::new(IsolationPolicy::new(["Visitor", "FollowUp"]))
}

/// Raw client that records every descriptor it receives and answers with a
/// canned output for the kind.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<OperationDescriptor>>,
    entities: Vec<EntityType>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_entities<I, E>(entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityType>,
    {
        Self {
            calls: Mutex::default(),
            entities: entities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn calls(&self) -> Vec<OperationDescriptor> {
        self.calls.lock().clone()
    }

    pub fn last(&self) -> Option<OperationDescriptor> {
        self.calls.lock().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn canned(kind: OperationKind) -> QueryOutput {
        match kind {
            OperationKind::ReadMany => QueryOutput::Many(Vec::new()),
            OperationKind::ReadOne => QueryOutput::One(None),
            OperationKind::Count => QueryOutput::Count(0),
            OperationKind::Aggregate => QueryOutput::Aggregate(Record::new()),
            OperationKind::GroupBy => QueryOutput::Groups(Vec::new()),
            OperationKind::Create
            | OperationKind::Update
            | OperationKind::Delete
            | OperationKind::Upsert => QueryOutput::Row(Record::new()),
            OperationKind::CreateMany | OperationKind::UpdateMany | OperationKind::DeleteMany => {
                QueryOutput::Affected(0)
            }
        }
    }
}

#[async_trait]
impl DataClient for RecordingClient {
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError> {
        let kind = op.kind;
        self.calls.lock().push(op);
        Ok(Self::canned(kind))
    }

    fn entity_types(&self) -> Vec<EntityType> {
        self.entities.clone()
    }
}
