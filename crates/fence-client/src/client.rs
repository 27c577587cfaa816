//! Data-access client seam
//!
//! [`DataClient`] is the single uniform call every store implements.
//! [`DataClientExt`] layers the per-kind call surface on top of it, so a raw
//! client and a scoped handle are used the same way.

use crate::error::ClientError;
use async_trait::async_trait;
use fence_model::{EntityType, OperationDescriptor, OperationKind, Record};
use std::fmt;
use std::sync::Arc;

/// Result of executing one operation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rows from `findMany`
    Many(Vec<Record>),
    /// Optional row from `findFirst`
    One(Option<Record>),
    /// Row count from `count`
    Count(u64),
    /// Aggregate selectors and their values
    Aggregate(Record),
    /// One record per group
    Groups(Vec<Record>),
    /// Single row written or removed
    Row(Record),
    /// Number of rows affected by a bulk write
    Affected(u64),
}

impl QueryOutput {
    /// Variant name, for diagnostics
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Many(_) => "many",
            Self::One(_) => "one",
            Self::Count(_) => "count",
            Self::Aggregate(_) => "aggregate",
            Self::Groups(_) => "groups",
            Self::Row(_) => "row",
            Self::Affected(_) => "affected",
        }
    }

    fn unexpected(&self, kind: OperationKind) -> ClientError {
        ClientError::UnexpectedOutput {
            kind,
            found: self.variant_name(),
        }
    }

    /// Unwrap `Many`
    ///
    /// # Errors
    /// Returns `ClientError::UnexpectedOutput` for any other variant
    pub fn into_many(self, kind: OperationKind) -> Result<Vec<Record>, ClientError> {
        match self {
            Self::Many(rows) => Ok(rows),
            other => Err(other.unexpected(kind)),
        }
    }

    /// Unwrap `One`
    ///
    /// # Errors
    /// Returns `ClientError::UnexpectedOutput` for any other variant
    pub fn into_one(self, kind: OperationKind) -> Result<Option<Record>, ClientError> {
        match self {
            Self::One(row) => Ok(row),
            other => Err(other.unexpected(kind)),
        }
    }

    /// Unwrap `Count` or `Affected`
    ///
    /// # Errors
    /// Returns `ClientError::UnexpectedOutput` for any other variant
    pub fn into_count(self, kind: OperationKind) -> Result<u64, ClientError> {
        match self {
            Self::Count(n) | Self::Affected(n) => Ok(n),
            other => Err(other.unexpected(kind)),
        }
    }

    /// Unwrap `Aggregate` or `Row`
    ///
    /// # Errors
    /// Returns `ClientError::UnexpectedOutput` for any other variant
    pub fn into_record(self, kind: OperationKind) -> Result<Record, ClientError> {
        match self {
            Self::Aggregate(row) | Self::Row(row) => Ok(row),
            other => Err(other.unexpected(kind)),
        }
    }

    /// Unwrap `Groups`
    ///
    /// # Errors
    /// Returns `ClientError::UnexpectedOutput` for any other variant
    pub fn into_groups(self, kind: OperationKind) -> Result<Vec<Record>, ClientError> {
        match self {
            Self::Groups(rows) => Ok(rows),
            other => Err(other.unexpected(kind)),
        }
    }
}

/// Uniform data-access client
#[async_trait]
pub trait DataClient: Send + Sync + fmt::Debug {
    /// Execute one operation
    ///
    /// # Errors
    /// Returns the store's error unmodified, or a rewrite error when the
    /// client scopes calls before delegating
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError>;

    /// Entity types the store knows about
    ///
    /// An empty list means the store does not support introspection.
    fn entity_types(&self) -> Vec<EntityType> {
        Vec::new()
    }
}

#[async_trait]
impl<T: DataClient + ?Sized> DataClient for Arc<T> {
    async fn execute(&self, op: OperationDescriptor) -> Result<QueryOutput, ClientError> {
        (**self).execute(op).await
    }

    fn entity_types(&self) -> Vec<EntityType> {
        (**self).entity_types()
    }
}

/// Per-kind call surface for every [`DataClient`]
#[async_trait]
pub trait DataClientExt: DataClient {
    /// All rows matching `filter`
    async fn find_many<E>(&self, entity: E, filter: Record) -> Result<Vec<Record>, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::find_many(entity, filter)).await?;
        out.into_many(OperationKind::ReadMany)
    }

    /// First row matching `filter`
    async fn find_first<E>(&self, entity: E, filter: Record) -> Result<Option<Record>, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::find_first(entity, filter)).await?;
        out.into_one(OperationKind::ReadOne)
    }

    /// Number of rows matching `filter`
    async fn count<E>(&self, entity: E, filter: Record) -> Result<u64, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::count(entity, filter)).await?;
        out.into_count(OperationKind::Count)
    }

    /// Aggregate selectors over rows matching `filter`
    async fn aggregate<E>(
        &self,
        entity: E,
        filter: Record,
        selectors: Record,
    ) -> Result<Record, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let op = OperationDescriptor::aggregate(entity, filter, selectors);
        self.execute(op).await?.into_record(OperationKind::Aggregate)
    }

    /// Group rows matching `filter` by the `by` fields
    async fn group_by<E>(
        &self,
        entity: E,
        by: Vec<String>,
        filter: Record,
    ) -> Result<Vec<Record>, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let op = OperationDescriptor::group_by(entity, by, filter);
        self.execute(op).await?.into_groups(OperationKind::GroupBy)
    }

    /// Insert one row
    async fn create<E>(&self, entity: E, payload: Record) -> Result<Record, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::create(entity, payload)).await?;
        out.into_record(OperationKind::Create)
    }

    /// Insert rows, returning how many were written
    async fn create_many<E>(&self, entity: E, rows: Vec<Record>) -> Result<u64, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::create_many(entity, rows)).await?;
        out.into_count(OperationKind::CreateMany)
    }

    /// Update the row matching `filter`
    async fn update<E>(&self, entity: E, filter: Record, data: Record) -> Result<Record, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::update(entity, filter, data)).await?;
        out.into_record(OperationKind::Update)
    }

    /// Update every row matching `filter`
    async fn update_many<E>(&self, entity: E, filter: Record, data: Record) -> Result<u64, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let op = OperationDescriptor::update_many(entity, filter, data);
        self.execute(op).await?.into_count(OperationKind::UpdateMany)
    }

    /// Delete the row matching `filter`
    async fn delete<E>(&self, entity: E, filter: Record) -> Result<Record, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::delete(entity, filter)).await?;
        out.into_record(OperationKind::Delete)
    }

    /// Delete every row matching `filter`
    async fn delete_many<E>(&self, entity: E, filter: Record) -> Result<u64, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let out = self.execute(OperationDescriptor::delete_many(entity, filter)).await?;
        out.into_count(OperationKind::DeleteMany)
    }

    /// Update the row matching `filter`, or insert `create` if none
    async fn upsert<E>(
        &self,
        entity: E,
        filter: Record,
        create: Record,
        update: Record,
    ) -> Result<Record, ClientError>
    where
        E: Into<EntityType> + Send,
    {
        let op = OperationDescriptor::upsert(entity, filter, create, update);
        self.execute(op).await?.into_record(OperationKind::Upsert)
    }
}

impl<T: DataClient + ?Sized> DataClientExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_unwraps_matching_variant() {
        assert_eq!(QueryOutput::Count(3).into_count(OperationKind::Count).unwrap(), 3);
        assert_eq!(
            QueryOutput::Affected(2).into_count(OperationKind::DeleteMany).unwrap(),
            2
        );
        assert!(QueryOutput::One(None).into_one(OperationKind::ReadOne).unwrap().is_none());
    }

    #[test]
    fn output_rejects_other_variant() {
        let err = QueryOutput::Count(1).into_many(OperationKind::ReadMany).unwrap_err();
        assert_eq!(
            err,
            ClientError::UnexpectedOutput {
                kind: OperationKind::ReadMany,
                found: "count",
            }
        );
        assert_eq!(err.to_string(), "unexpected count output for findMany");
    }
}
