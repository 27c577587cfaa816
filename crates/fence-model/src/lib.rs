//! Tenant Fence Model
//!
//! The vocabulary shared by every layer of the tenant-isolation fence.
//!
//! # Core Concepts
//!
//! - [`Principal`]: Authenticated identity attached to a request
//! - [`IsolationPolicy`]: Static set of tenant-scoped entity types
//! - [`OperationKind`]: Closed set of data-access call shapes
//! - [`OperationDescriptor`]: Normalized data-access call (entity, kind, arguments)
//!
//! # Example
//!
//! ```rust
//! use fence_model::{EntityType, IsolationPolicy, OperationDescriptor, OperationKind};
//!
//! let policy = IsolationPolicy::new(["Visitor"]);
//! assert!(policy.is_isolated(&EntityType::from("Visitor")));
//! assert!(!policy.is_isolated(&EntityType::from("RoleCatalog")));
//!
//! let op = OperationDescriptor::new("Visitor", OperationKind::ReadMany);
//! assert_eq!(op.kind.as_str(), "findMany");
//! ```

#![warn(unreachable_pub)]

mod error;
mod ids;
mod operation;
mod policy;
mod principal;

pub use error::ModelError;
pub use ids::{EntityType, SubjectId, TenantId};
pub use operation::{json_type_name, to_record, OperationDescriptor, OperationKind, Record};
pub use policy::{IsolationPolicy, DEFAULT_TENANT_FIELD, VISITOR_MANAGEMENT_ENTITIES};
pub use principal::{Principal, PrincipalScope, ScopeKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
