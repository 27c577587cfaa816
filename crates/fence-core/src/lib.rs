//! Tenant Fence Core
//!
//! Entry point for request handlers. [`TenantIsolation`] owns the policy,
//! the scoped client factory and the per-tenant cache, and hands each
//! request the client it must use.
//!
//! # Request flow
//!
//! ```text
//! authenticated request ─► client_for(Some(principal)) ─► RequestClient::Scoped
//! anonymous request     ─► client_for(None)            ─► RequestClient::Unscoped
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fence_core::{IsolationConfig, TenantIsolation};
//! use fence_client::DataClientExt;
//!
//! let isolation = TenantIsolation::new(raw_client, &IsolationConfig::load(None)?)?;
//! let client = isolation.client_for(Some(&principal)).await?;
//! let follow_ups = client.find_many("FollowUp", filter).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod isolation;
pub mod telemetry;

pub use config::{CacheConfig, IsolationConfig, LogConfig, ENV_PREFIX};
pub use error::{ConfigError, FenceError, Result};
pub use isolation::{RequestClient, TenantIsolation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for request handlers
    pub use crate::config::IsolationConfig;
    pub use crate::error::{FenceError, Result};
    pub use crate::isolation::{RequestClient, TenantIsolation};
    pub use fence_client::{DataClient, DataClientExt, QueryOutput};
    pub use fence_model::{OperationDescriptor, Principal, Record, TenantId};
}
