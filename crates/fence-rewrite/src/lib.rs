//! Tenant Fence Rewriter
//!
//! Pure rewriting of data-access calls so that every call on a tenant-scoped
//! entity carries the caller's tenant.
//!
//! # Core Concepts
//!
//! - [`RewriteShape`]: How a call is scoped, selected from `(isolated?, kind)`
//! - [`ArgumentRewriter`]: Applies the shape's handler to a descriptor
//! - [`RewriteError`]: Calls that cannot be scoped and are rejected
//!
//! The tenant written by the rewriter always replaces any tenant the caller
//! supplied.
//!
//! # Example
//!
//! ```rust
//! use fence_model::{to_record, IsolationPolicy, OperationDescriptor, TenantId};
//! use fence_rewrite::ArgumentRewriter;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let rewriter = ArgumentRewriter::new(Arc::new(IsolationPolicy::new(["Visitor"])));
//! let op = OperationDescriptor::find_many(
//!     "Visitor",
//!     to_record(json!({ "tenantId": "T2", "status": "NEW" })).unwrap(),
//! );
//!
//! let scoped = rewriter.rewrite(&TenantId::from("T1"), op).unwrap();
//! assert_eq!(scoped.filter.unwrap()["tenantId"], json!("T1"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod rewriter;
mod shape;

pub use error::{RewriteError, Violation};
pub use rewriter::ArgumentRewriter;
pub use shape::{classify, isolated_shape, RewriteShape};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
