//! Tenant Fence Client
//!
//! The interception layer between request handlers and the data store.
//!
//! # Core Operations
//!
//! - **Wrap**: [`ScopedClientFactory`] binds a raw [`DataClient`] to one tenant
//! - **Scope**: [`ScopedHandle`] rewrites every call before delegating
//! - **Reuse**: [`ScopedClientCache`] keeps one handle per recently-seen tenant
//!
//! # Architecture
//!
//! ```text
//! Principal → ScopedClientCache::get(tenant) → ScopedHandle → ArgumentRewriter → raw DataClient
//!                    ↑__________↓
//!              ScopedClientFactory (on miss)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fence_client::{CacheSettings, DataClientExt, ScopedClientCache, ScopedClientFactory};
//!
//! let factory = ScopedClientFactory::new(raw_client, policy);
//! let cache = ScopedClientCache::new(factory, CacheSettings::default());
//!
//! let handle = cache.get(principal.tenant_id()).await?;
//! let visitors = handle.find_many("FirstTimer", filter).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod client;
pub mod error;
pub mod factory;
pub mod handle;
pub mod memory;

// Re-exports for convenience
pub use cache::{CacheSettings, CacheStats, ScopedClientCache, DEFAULT_CAPACITY};
pub use client::{DataClient, DataClientExt, QueryOutput};
pub use error::{CacheError, ClientError, StoreError};
pub use factory::{ScopedClientFactory, MAX_TENANT_ID_LEN};
pub use handle::ScopedHandle;
pub use memory::MemoryStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with scoped clients
    pub use crate::cache::{CacheSettings, ScopedClientCache};
    pub use crate::client::{DataClient, DataClientExt, QueryOutput};
    pub use crate::error::{CacheError, ClientError, StoreError};
    pub use crate::factory::ScopedClientFactory;
    pub use crate::handle::ScopedHandle;
    pub use fence_model::{
        EntityType, IsolationPolicy, OperationDescriptor, OperationKind, Principal, Record,
        TenantId,
    };
}
