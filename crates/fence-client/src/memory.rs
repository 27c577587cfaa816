//! In-memory data store for testing and local tooling.
//!
//! Rows are JSON records held per entity in a `DashMap`. Filters are
//! equality matches on every filter key; a filter value of `null` also
//! matches a missing field.
//!
//! Supported options:
//! - `skip` / `take` on `findMany`
//! - `_count`, `_sum`, `_min`, `_max` on `aggregate`
//! - `by` on `groupBy`
//! - `skipDuplicates` on `createMany`
//!
//! Rows are unique on `id`; a row created without one is assigned
//! `<entity>-<n>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::{DataClient, QueryOutput};
use crate::error::{ClientError, StoreError};
use fence_model::{json_type_name, EntityType, OperationDescriptor, OperationKind, Record};

const ID_FIELD: &str = "id";

/// In-memory implementation of [`DataClient`].
///
/// Executes whatever it is given: it performs no tenant scoping of its own.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<EntityType, Vec<Record>>,
    /// Entity types reported by introspection; empty means unsupported.
    declared: Vec<EntityType>,
    next_id: AtomicU64,
    executed: AtomicU64,
    pending_failure: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    /// Creates a store without introspection that accepts any entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Creates a store that only knows the given entity types.
    pub fn with_entities<I, E>(entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntityType>,
    {
        Self {
            declared: entities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Makes the next call fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        *self.pending_failure.lock() = Some(err);
    }

    /// Number of calls that reached the store.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Every row of `entity`, unscoped.
    pub fn rows(&self, entity: &EntityType) -> Vec<Record> {
        self.tables
            .get(entity)
            .map(|t| t.value().clone())
            .unwrap_or_default()
    }

    /// Inserts rows directly, bypassing uniqueness checks.
    pub fn seed<I>(&self, entity: impl Into<EntityType>, rows: I)
    where
        I: IntoIterator<Item = Record>,
    {
        self.tables.entry(entity.into()).or_default().extend(rows);
    }

    fn assign_id(&self, entity: &EntityType, row: &mut Record) {
        if !row.contains_key(ID_FIELD) {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            row.insert(ID_FIELD.to_string(), Value::String(format!("{entity}-{n}")));
        }
    }

    fn apply(&self, op: OperationDescriptor) -> Result<QueryOutput, StoreError> {
        let OperationDescriptor {
            entity,
            kind,
            filter,
            payload,
            batch_payload,
            update,
            options,
        } = op;

        if !self.declared.is_empty() && !self.declared.contains(&entity) {
            return Err(StoreError::InvalidArguments(format!(
                "unknown entity {entity}"
            )));
        }

        let filter = filter.unwrap_or_default();
        let mut table = self.tables.entry(entity.clone()).or_default();
        let rows = table.value_mut();

        let out = match kind {
            OperationKind::ReadMany => {
                let skip = option_usize(&options, "skip").unwrap_or(0);
                let take = option_usize(&options, "take").unwrap_or(usize::MAX);
                QueryOutput::Many(
                    matching(rows, &filter)
                        .skip(skip)
                        .take(take)
                        .cloned()
                        .collect(),
                )
            }
            OperationKind::ReadOne => QueryOutput::One(matching(rows, &filter).next().cloned()),
            OperationKind::Count => QueryOutput::Count(matching(rows, &filter).count() as u64),
            OperationKind::Aggregate => {
                let selected: Vec<&Record> = matching(rows, &filter).collect();
                QueryOutput::Aggregate(aggregate(&selected, &options))
            }
            OperationKind::GroupBy => {
                let keys = group_keys(&options)?;
                let selected: Vec<&Record> = matching(rows, &filter).collect();
                QueryOutput::Groups(group(&selected, &keys))
            }
            OperationKind::Create => {
                let mut row = payload.ok_or_else(|| missing("create", "data"))?;
                self.assign_id(&entity, &mut row);
                check_unique(&entity, rows, &row)?;
                rows.push(row.clone());
                QueryOutput::Row(row)
            }
            OperationKind::CreateMany => {
                let batch = batch_payload.ok_or_else(|| missing("createMany", "data"))?;
                let skip_duplicates = options
                    .get("skipDuplicates")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let incoming = batch_rows(batch)?;

                let mut accepted: Vec<Record> = Vec::with_capacity(incoming.len());
                for mut row in incoming {
                    self.assign_id(&entity, &mut row);
                    let duplicate = check_unique(&entity, rows, &row)
                        .and_then(|()| check_unique(&entity, &accepted, &row));
                    match duplicate {
                        Ok(()) => accepted.push(row),
                        Err(_) if skip_duplicates => {}
                        Err(err) => return Err(err),
                    }
                }
                let written = accepted.len() as u64;
                rows.extend(accepted);
                QueryOutput::Affected(written)
            }
            OperationKind::Update => {
                let data = payload.ok_or_else(|| missing("update", "data"))?;
                let row = rows
                    .iter_mut()
                    .find(|r| matches(r, &filter))
                    .ok_or_else(|| StoreError::not_found(entity.clone()))?;
                merge(row, data);
                QueryOutput::Row(row.clone())
            }
            OperationKind::UpdateMany => {
                let data = payload.ok_or_else(|| missing("updateMany", "data"))?;
                let mut affected = 0;
                for row in rows.iter_mut().filter(|r| matches(r, &filter)) {
                    merge(row, data.clone());
                    affected += 1;
                }
                QueryOutput::Affected(affected)
            }
            OperationKind::Delete => {
                let index = rows
                    .iter()
                    .position(|r| matches(r, &filter))
                    .ok_or_else(|| StoreError::not_found(entity.clone()))?;
                QueryOutput::Row(rows.remove(index))
            }
            OperationKind::DeleteMany => {
                let before = rows.len();
                rows.retain(|r| !matches(r, &filter));
                QueryOutput::Affected((before - rows.len()) as u64)
            }
            OperationKind::Upsert => {
                if let Some(row) = rows.iter_mut().find(|r| matches(r, &filter)) {
                    merge(row, update.unwrap_or_default());
                    QueryOutput::Row(row.clone())
                } else {
                    let mut row = payload.ok_or_else(|| missing("upsert", "create"))?;
                    self.assign_id(&entity, &mut row);
                    check_unique(&entity, rows, &row)?;
                    rows.push(row.clone());
                    QueryOutput::Row(row)
                }
            }
        };

        Ok(out)
    }
}

#[async_trait]
impl DataClient for MemoryStore {
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError> {
        self.executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(entity = %op.entity, kind = %op.kind, "memory store executing");

        if let Some(err) = self.pending_failure.lock().take() {
            return Err(err.into());
        }
        Ok(self.apply(op)?)
    }

    fn entity_types(&self) -> Vec<EntityType> {
        self.declared.clone()
    }
}

fn matches(row: &Record, filter: &Record) -> bool {
    filter
        .iter()
        .all(|(key, expected)| row.get(key).unwrap_or(&Value::Null) == expected)
}

fn matching<'a>(rows: &'a [Record], filter: &'a Record) -> impl Iterator<Item = &'a Record> + 'a {
    rows.iter().filter(move |r| matches(r, filter))
}

fn merge(row: &mut Record, data: Record) {
    for (key, value) in data {
        row.insert(key, value);
    }
}

fn missing(operation: &str, argument: &str) -> StoreError {
    StoreError::InvalidArguments(format!("{operation} requires '{argument}'"))
}

fn option_usize(options: &Record, key: &str) -> Option<usize> {
    options
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn check_unique(entity: &EntityType, rows: &[Record], row: &Record) -> Result<(), StoreError> {
    let id = row.get(ID_FIELD);
    if rows.iter().any(|r| r.get(ID_FIELD) == id) {
        return Err(StoreError::unique_violation(entity.clone(), ID_FIELD));
    }
    Ok(())
}

fn batch_rows(batch: Value) -> Result<Vec<Record>, StoreError> {
    let items = match batch {
        Value::Array(items) => items,
        other => {
            return Err(StoreError::InvalidArguments(format!(
                "createMany data is {}, expected an array",
                json_type_name(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::InvalidArguments(format!(
                "createMany row {index} is {}",
                json_type_name(&other)
            ))),
        })
        .collect()
}

fn selected_fields(options: &Record, selector: &str) -> Vec<String> {
    match options.get(selector) {
        Some(Value::Object(fields)) => fields
            .iter()
            .filter(|(_, on)| on.as_bool().unwrap_or(false))
            .map(|(field, _)| field.clone())
            .collect(),
        _ => Vec::new(),
    }
}

fn numbers<'a>(rows: &'a [&Record], field: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    rows.iter()
        .filter_map(move |r| r.get(field))
        .filter(|v| v.is_number())
}

fn sum(rows: &[&Record], field: &str) -> Value {
    let values: Vec<&Value> = numbers(rows, field).collect();
    if values.is_empty() {
        return Value::Null;
    }
    if values.iter().all(|v| v.is_i64()) {
        json!(values.iter().filter_map(|v| v.as_i64()).sum::<i64>())
    } else {
        json!(values.iter().filter_map(|v| v.as_f64()).sum::<f64>())
    }
}

fn extreme(rows: &[&Record], field: &str, want_max: bool) -> Value {
    numbers(rows, field)
        .fold(None::<&Value>, |best, v| match best {
            None => Some(v),
            Some(b) => {
                let (bv, vv) = (b.as_f64().unwrap_or(0.0), v.as_f64().unwrap_or(0.0));
                if (want_max && vv > bv) || (!want_max && vv < bv) {
                    Some(v)
                } else {
                    Some(b)
                }
            }
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn aggregate(rows: &[&Record], options: &Record) -> Record {
    let mut out = Record::new();

    if options.contains_key("_count") {
        out.insert("_count".to_string(), json!(rows.len()));
    }

    for selector in ["_sum", "_min", "_max"] {
        let fields = selected_fields(options, selector);
        if fields.is_empty() {
            continue;
        }
        let values: Record = fields
            .into_iter()
            .map(|field| {
                let value = match selector {
                    "_sum" => sum(rows, &field),
                    "_min" => extreme(rows, &field, false),
                    _ => extreme(rows, &field, true),
                };
                (field, value)
            })
            .collect();
        out.insert(selector.to_string(), Value::Object(values));
    }

    out
}

fn group_keys(options: &Record) -> Result<Vec<String>, StoreError> {
    let keys = match options.get("by") {
        Some(Value::Array(keys)) => keys,
        Some(Value::String(key)) => return Ok(vec![key.clone()]),
        _ => return Err(missing("groupBy", "by")),
    };

    keys.iter()
        .map(|k| {
            k.as_str()
                .map(str::to_string)
                .ok_or_else(|| StoreError::InvalidArguments("groupBy keys must be strings".into()))
        })
        .collect()
}

fn group(rows: &[&Record], keys: &[String]) -> Vec<Record> {
    // Value is not Hash; groups are few, so a linear scan keeps first-seen order.
    let mut groups: Vec<(Vec<Value>, u64)> = Vec::new();
    for row in rows {
        let values: Vec<Value> = keys
            .iter()
            .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
            .collect();
        match groups.iter_mut().find(|(seen, _)| *seen == values) {
            Some((_, count)) => *count += 1,
            None => groups.push((values, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(values, count)| {
            let mut out: Record = keys.iter().cloned().zip(values).collect();
            out.insert("_count".to_string(), json!(count));
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DataClientExt;
    use fence_model::to_record;

    fn rec(value: Value) -> Record {
        to_record(value).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(
            "Visitor",
            [
                rec(json!({ "id": "v1", "tenantId": "T1", "status": "NEW", "visits": 2 })),
                rec(json!({ "id": "v2", "tenantId": "T1", "status": "DONE", "visits": 5 })),
                rec(json!({ "id": "v3", "tenantId": "T2", "status": "NEW", "visits": 1 })),
            ],
        );
        store
    }

    #[tokio::test]
    async fn find_many_filters_and_pages() {
        let store = seeded();

        let rows = store.find_many("Visitor", rec(json!({ "status": "NEW" }))).await.unwrap();
        assert_eq!(rows.len(), 2);

        let op = OperationDescriptor::find_many("Visitor", Record::new())
            .with_option("skip", json!(1))
            .with_option("take", json!(1));
        let rows = store.execute(op).await.unwrap().into_many(OperationKind::ReadMany).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("v2"));
    }

    #[tokio::test]
    async fn create_assigns_id_and_enforces_uniqueness() {
        let store = MemoryStore::new();

        let row = store.create("Visitor", rec(json!({ "name": "Ada" }))).await.unwrap();
        assert_eq!(row["id"], json!("Visitor-1"));

        let err = store
            .create("Visitor", rec(json!({ "id": "Visitor-1" })))
            .await
            .unwrap_err();
        assert_eq!(
            err.as_store(),
            Some(&StoreError::unique_violation("Visitor", "id"))
        );
    }

    #[tokio::test]
    async fn create_many_skip_duplicates() {
        let store = seeded();
        let batch = vec![rec(json!({ "id": "v1" })), rec(json!({ "id": "v9" }))];

        let err = store.create_many("Visitor", batch.clone()).await.unwrap_err();
        assert!(err.as_store().is_some());
        assert_eq!(store.rows(&"Visitor".into()).len(), 3);

        let op = OperationDescriptor::create_many("Visitor", batch)
            .with_option("skipDuplicates", json!(true));
        let written = store.execute(op).await.unwrap();
        assert_eq!(written, QueryOutput::Affected(1));
    }

    #[tokio::test]
    async fn update_and_delete_report_not_found() {
        let store = seeded();

        let err = store
            .update("Visitor", rec(json!({ "id": "nope" })), rec(json!({ "status": "X" })))
            .await
            .unwrap_err();
        assert_eq!(err.as_store(), Some(&StoreError::not_found("Visitor")));

        let removed = store.delete("Visitor", rec(json!({ "id": "v1" }))).await.unwrap();
        assert_eq!(removed["id"], json!("v1"));
        assert!(store.delete("Visitor", rec(json!({ "id": "v1" }))).await.is_err());
    }

    #[tokio::test]
    async fn bulk_writes_count_affected_rows() {
        let store = seeded();

        let n = store
            .update_many("Visitor", rec(json!({ "tenantId": "T1" })), rec(json!({ "status": "SEEN" })))
            .await
            .unwrap();
        assert_eq!(n, 2);

        let n = store.delete_many("Visitor", rec(json!({ "status": "SEEN" }))).await.unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.count("Visitor", Record::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_updates_or_creates() {
        let store = seeded();

        let row = store
            .upsert(
                "Visitor",
                rec(json!({ "id": "v1" })),
                rec(json!({ "id": "v1" })),
                rec(json!({ "status": "DONE" })),
            )
            .await
            .unwrap();
        assert_eq!(row["status"], json!("DONE"));

        let row = store
            .upsert(
                "Visitor",
                rec(json!({ "id": "v7" })),
                rec(json!({ "id": "v7", "status": "NEW" })),
                rec(json!({ "status": "DONE" })),
            )
            .await
            .unwrap();
        assert_eq!(row["status"], json!("NEW"));
        assert_eq!(store.rows(&"Visitor".into()).len(), 4);
    }

    #[tokio::test]
    async fn aggregate_selectors() {
        let store = seeded();

        let out = store
            .aggregate(
                "Visitor",
                rec(json!({ "tenantId": "T1" })),
                rec(json!({ "_count": true, "_sum": { "visits": true }, "_max": { "visits": true } })),
            )
            .await
            .unwrap();

        assert_eq!(out["_count"], json!(2));
        assert_eq!(out["_sum"]["visits"], json!(7));
        assert_eq!(out["_max"]["visits"], json!(5));
    }

    #[tokio::test]
    async fn group_by_counts_per_key() {
        let store = seeded();

        let groups = store
            .group_by("Visitor", vec!["status".to_string()], Record::new())
            .await
            .unwrap();

        assert_eq!(
            groups,
            vec![
                rec(json!({ "status": "NEW", "_count": 2 })),
                rec(json!({ "status": "DONE", "_count": 1 })),
            ]
        );
    }

    #[tokio::test]
    async fn injected_failure_is_returned_once() {
        let store = seeded();
        store.fail_next(StoreError::Connectivity("down".into()));

        let err = store.count("Visitor", Record::new()).await.unwrap_err();
        assert_eq!(err.as_store(), Some(&StoreError::Connectivity("down".into())));
        assert_eq!(store.count("Visitor", Record::new()).await.unwrap(), 3);
        assert_eq!(store.executed(), 2);
    }

    #[tokio::test]
    async fn declared_entities_limit_introspection_and_calls() {
        let store = MemoryStore::with_entities(["Visitor"]);
        assert_eq!(store.entity_types(), vec![EntityType::from("Visitor")]);

        let err = store.count("Church", Record::new()).await.unwrap_err();
        assert!(matches!(err.as_store(), Some(StoreError::InvalidArguments(_))));
    }
}
