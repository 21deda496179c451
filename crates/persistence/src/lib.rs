//! Tenantry persistence layer
//!
//! A multi-tenant record store. Every persisted record belongs to exactly one
//! tenant, and every read or write made on behalf of a caller is confined to
//! that caller's tenant unless the caller is the super-admin.
//!
//! Isolation is enforced twice at the data-access boundary:
//!
//! - the [`access`] interceptor installs a session row filter for the caller's
//!   tenant around every repository call;
//! - the [`query`] engine adds its own `tenantId == <caller tenant>` term to
//!   every predicate it runs.
//!
//! Both layers have to fail together for data to cross tenants.
//!
//! # Architecture
//!
//! - [`tenant`] - Caller identity and the unit-of-work binding
//! - [`ids`] - Time-ordered 64-bit identifiers
//! - [`record`] - The record model and the lifecycle hooks that stamp metadata
//! - [`query`] - Predicates, sorting, pagination and the query engine
//! - [`access`] - The tenant filter interceptor
//! - [`backends`] - SQLite storage with the session row filter
//! - [`core`] - Repository and session traits
//! - [`store`] - The composition root
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tenantry_persistence::core::Repository;
//! use tenantry_persistence::query::{PageRequest, Predicate, Sort};
//! use tenantry_persistence::record::{Record, RecordMeta, RecordScope};
//! use tenantry_persistence::store::RecordStore;
//! use tenantry_persistence::tenant::{IdentityContext, TenantId};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Invoice {
//!     #[serde(skip)]
//!     meta: RecordMeta,
//!     number: String,
//!     amount: i64,
//! }
//!
//! impl Record for Invoice {
//!     const KIND: &'static str = "invoice";
//!     const SCOPE: RecordScope = RecordScope::Tenant;
//!     const FIELDS: &'static [&'static str] = &["number", "amount"];
//!
//!     fn meta(&self) -> &RecordMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut RecordMeta { &mut self.meta }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RecordStore::in_memory()?;
//! let invoices = store.repository::<Invoice>();
//!
//! let alice = IdentityContext::new(TenantId::new("acme"), "alice");
//! let saved = invoices
//!     .save(&alice, Invoice { number: "INV-1".into(), amount: 120, ..Default::default() })
//!     .await?;
//! assert_eq!(saved.meta.created_by.as_deref(), Some("alice"));
//!
//! let bob = IdentityContext::new(TenantId::new("globex"), "bob");
//! assert!(invoices.get_by_id(&bob, saved.meta.id.unwrap()).await?.is_none());
//!
//! let page = invoices
//!     .page(&alice, &Predicate::ge("amount", 100), PageRequest::default(), &Sort::parse("-amount"))
//!     .await?;
//! assert_eq!(page.total, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod access;
pub mod backends;
pub mod core;
pub mod error;
pub mod ids;
pub mod query;
pub mod record;
pub mod store;
pub mod tenant;

// Re-export commonly used types at crate root
pub use access::{AccessInterceptor, TenantBypass};
pub use core::{Repository, SessionSource};
pub use error::{StorageError, StorageResult};
pub use ids::{IdGenerator, IdGeneratorConfig};
pub use query::{Page, PageRequest, Predicate, Sort};
pub use record::{Record, RecordMeta, RecordScope};
pub use store::{RecordStore, StoreConfig};
pub use tenant::{IdentityContext, TenantId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
