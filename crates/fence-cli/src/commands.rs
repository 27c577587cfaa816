//! Subcommand implementations

use anyhow::{anyhow, Context};
use fence_core::IsolationConfig;
use fence_model::{EntityType, IsolationPolicy, OperationDescriptor, OperationKind, TenantId};
use fence_rewrite::{isolated_shape, ArgumentRewriter, RewriteShape};
use serde_json::Value;
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<IsolationConfig> {
    IsolationConfig::load(path).with_context(|| match path {
        Some(path) => format!("loading {}", path.display()),
        None => "loading default configuration".to_string(),
    })
}

pub(crate) fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

/// Shape of every kind for every isolated entity, then for any other entity.
pub(crate) fn policy_report(policy: &IsolationPolicy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "tenant field: {}", policy.tenant_field());
    let _ = writeln!(out, "isolated entities: {}", policy.len());

    for entity in policy.isolated_entities() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{entity}");
        for kind in OperationKind::ALL {
            let _ = writeln!(out, "  {:<12} {}", kind.as_str(), isolated_shape(kind));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "(any other entity)");
    for kind in OperationKind::ALL {
        let _ = writeln!(out, "  {:<12} {}", kind.as_str(), RewriteShape::Passthrough);
    }
    out
}

/// Rewrite a JSON descriptor on behalf of `tenant`.
///
/// The operation name is resolved before the descriptor is decoded, so an
/// unknown operation on an isolated entity surfaces as a policy violation.
pub(crate) fn rewrite_json(
    rewriter: &ArgumentRewriter,
    tenant: &TenantId,
    input: &str,
) -> anyhow::Result<OperationDescriptor> {
    let value: Value = serde_json::from_str(input).context("input is not valid JSON")?;

    let entity = value
        .get("entity")
        .and_then(Value::as_str)
        .map(EntityType::from)
        .ok_or_else(|| anyhow!("descriptor has no string 'entity'"))?;
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("descriptor has no string 'kind'"))?;
    rewriter.resolve_kind(&entity, kind)?;

    let op: OperationDescriptor =
        serde_json::from_value(value).context("input is not an operation descriptor")?;
    tracing::debug!(tenant = %tenant, entity = %op.entity, kind = %op.kind, "Rewriting descriptor");
    Ok(rewriter.rewrite(tenant, op)?)
}
