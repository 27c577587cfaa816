//! Operation kinds and descriptors
//!
//! An [`OperationDescriptor`] is the normalized form of one data-access call:
//! which entity, which kind of operation, and the caller-supplied arguments.
//! Every call made through a data client is expressed as a descriptor before
//! it reaches storage.

use crate::error::ModelError;
use crate::ids::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A JSON object: read predicate, write payload or option bag
pub type Record = Map<String, Value>;

/// Convert a JSON value into a [`Record`]
///
/// # Errors
/// Returns [`ModelError::NotARecord`] if the value is not an object
pub fn to_record(value: Value) -> Result<Record, ModelError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ModelError::NotARecord(json_type_name(&other).to_string())),
    }
}

/// JSON type name of a value, for diagnostics
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Closed set of data-access operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum OperationKind {
    /// Filtered multi-row read
    ReadMany,
    /// Filtered single-row read
    ReadOne,
    /// Filtered row count
    Count,
    /// Filtered aggregate (`_count`, `_sum`, ...)
    Aggregate,
    /// Filtered grouping
    GroupBy,
    /// Single insert
    Create,
    /// Bulk insert
    CreateMany,
    /// Single-row update
    Update,
    /// Bulk update
    UpdateMany,
    /// Single-row delete
    Delete,
    /// Bulk delete
    DeleteMany,
    /// Insert-or-update
    Upsert,
}

impl OperationKind {
    /// Every kind, in declaration order
    pub const ALL: [OperationKind; 12] = [
        Self::ReadMany,
        Self::ReadOne,
        Self::Count,
        Self::Aggregate,
        Self::GroupBy,
        Self::Create,
        Self::CreateMany,
        Self::Update,
        Self::UpdateMany,
        Self::Delete,
        Self::DeleteMany,
        Self::Upsert,
    ];

    /// Wire name of the kind
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadMany => "findMany",
            Self::ReadOne => "findFirst",
            Self::Count => "count",
            Self::Aggregate => "aggregate",
            Self::GroupBy => "groupBy",
            Self::Create => "create",
            Self::CreateMany => "createMany",
            Self::Update => "update",
            Self::UpdateMany => "updateMany",
            Self::Delete => "delete",
            Self::DeleteMany => "deleteMany",
            Self::Upsert => "upsert",
        }
    }

    /// Whether the kind only reads
    #[inline]
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadMany | Self::ReadOne | Self::Count | Self::Aggregate | Self::GroupBy
        )
    }

    /// Whether the kind may touch more than one row
    #[inline]
    #[must_use]
    pub const fn is_bulk(self) -> bool {
        matches!(
            self,
            Self::ReadMany
                | Self::Count
                | Self::Aggregate
                | Self::GroupBy
                | Self::CreateMany
                | Self::UpdateMany
                | Self::DeleteMany
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "findMany" => Self::ReadMany,
            "findFirst" | "findUnique" | "findFirstOrThrow" | "findUniqueOrThrow" => Self::ReadOne,
            "count" => Self::Count,
            "aggregate" => Self::Aggregate,
            "groupBy" => Self::GroupBy,
            "create" => Self::Create,
            "createMany" => Self::CreateMany,
            "update" => Self::Update,
            "updateMany" => Self::UpdateMany,
            "delete" => Self::Delete,
            "deleteMany" => Self::DeleteMany,
            "upsert" => Self::Upsert,
            other => return Err(ModelError::UnknownOperation(other.to_string())),
        };
        Ok(kind)
    }
}

impl TryFrom<String> for OperationKind {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OperationKind> for &'static str {
    fn from(kind: OperationKind) -> Self {
        kind.as_str()
    }
}

/// Normalized data-access call
///
/// Which argument slots are meaningful depends on `kind`:
///
/// | kind | `filter` | `payload` | `batch_payload` | `update` |
/// |---|---|---|---|---|
/// | reads, `Delete*` | match predicate | - | - | - |
/// | `Create` | - | row to insert | - | - |
/// | `CreateMany` | - | - | array of rows | - |
/// | `Update*` | match predicate | data to set | - | - |
/// | `Upsert` | match predicate | create-branch | - | update-branch |
///
/// `options` holds pass-through arguments (ordering, paging, aggregate
/// selectors, group keys) and is never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Target entity type
    pub entity: EntityType,
    /// Operation kind
    pub kind: OperationKind,
    /// Read/match predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Record>,
    /// Write payload (create row, update data, upsert create-branch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Record>,
    /// Bulk insert rows; kept raw so a malformed batch can be rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_payload: Option<Value>,
    /// Upsert update-branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Record>,
    /// Pass-through arguments
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Record,
}

impl OperationDescriptor {
    /// Create descriptor with empty arguments
    #[must_use]
    pub fn new(entity: impl Into<EntityType>, kind: OperationKind) -> Self {
        Self {
            entity: entity.into(),
            kind,
            filter: None,
            payload: None,
            batch_payload: None,
            update: None,
            options: Record::new(),
        }
    }

    /// `findMany` with a filter
    #[must_use]
    pub fn find_many(entity: impl Into<EntityType>, filter: Record) -> Self {
        Self::new(entity, OperationKind::ReadMany).with_filter(filter)
    }

    /// `findFirst` with a filter
    #[must_use]
    pub fn find_first(entity: impl Into<EntityType>, filter: Record) -> Self {
        Self::new(entity, OperationKind::ReadOne).with_filter(filter)
    }

    /// `count` with a filter
    #[must_use]
    pub fn count(entity: impl Into<EntityType>, filter: Record) -> Self {
        Self::new(entity, OperationKind::Count).with_filter(filter)
    }

    /// `aggregate` with a filter and aggregate selectors (`_count`, `_sum`, ...)
    #[must_use]
    pub fn aggregate(entity: impl Into<EntityType>, filter: Record, selectors: Record) -> Self {
        let mut op = Self::new(entity, OperationKind::Aggregate).with_filter(filter);
        op.options = selectors;
        op
    }

    /// `groupBy` over the given keys
    #[must_use]
    pub fn group_by<I, S>(entity: impl Into<EntityType>, by: I, filter: Record) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = by.into_iter().map(|k| Value::String(k.into())).collect();
        Self::new(entity, OperationKind::GroupBy)
            .with_filter(filter)
            .with_option("by", Value::Array(keys))
    }

    /// `create` of one row
    #[must_use]
    pub fn create(entity: impl Into<EntityType>, payload: Record) -> Self {
        Self::new(entity, OperationKind::Create).with_payload(payload)
    }

    /// `createMany` of a batch of rows
    #[must_use]
    pub fn create_many(entity: impl Into<EntityType>, batch: Vec<Record>) -> Self {
        let rows = batch.into_iter().map(Value::Object).collect();
        Self::new(entity, OperationKind::CreateMany).with_batch(Value::Array(rows))
    }

    /// `update` of the first matching row
    #[must_use]
    pub fn update(entity: impl Into<EntityType>, filter: Record, data: Record) -> Self {
        Self::new(entity, OperationKind::Update)
            .with_filter(filter)
            .with_payload(data)
    }

    /// `updateMany` of every matching row
    #[must_use]
    pub fn update_many(entity: impl Into<EntityType>, filter: Record, data: Record) -> Self {
        Self::new(entity, OperationKind::UpdateMany)
            .with_filter(filter)
            .with_payload(data)
    }

    /// `delete` of the first matching row
    #[must_use]
    pub fn delete(entity: impl Into<EntityType>, filter: Record) -> Self {
        Self::new(entity, OperationKind::Delete).with_filter(filter)
    }

    /// `deleteMany` of every matching row
    #[must_use]
    pub fn delete_many(entity: impl Into<EntityType>, filter: Record) -> Self {
        Self::new(entity, OperationKind::DeleteMany).with_filter(filter)
    }

    /// `upsert`: update the match, or create from the create-branch
    #[must_use]
    pub fn upsert(
        entity: impl Into<EntityType>,
        filter: Record,
        create: Record,
        update: Record,
    ) -> Self {
        let mut op = Self::new(entity, OperationKind::Upsert)
            .with_filter(filter)
            .with_payload(create);
        op.update = Some(update);
        op
    }

    /// Set the filter
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: Record) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the payload
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: Record) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the raw batch payload
    #[inline]
    #[must_use]
    pub fn with_batch(mut self, batch: Value) -> Self {
        self.batch_payload = Some(batch);
        self
    }

    /// Add a pass-through option
    #[inline]
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}
