//! Caller identity for tenant-isolated storage.
//!
//! Every repository call receives an [`IdentityContext`]: the tenant the caller
//! belongs to and the username recorded in audit fields. The context is what
//! both isolation layers (the session row filter and the query engine's own
//! tenant predicate) are derived from.
//!
//! # Core Types
//!
//! - [`TenantId`] - Opaque tenant identifier
//! - [`IdentityContext`] - Tenant and username for one unit of work
//! - [`scope`] - Task-scoped binding of an identity for a unit of work
//!
//! # Super-admin
//!
//! The identity `(ROOT_TENANT, SUPER_ADMIN)` is the only one exempt from
//! tenant isolation. Both values are reserved constants; there is no other
//! escape hatch apart from the explicitly marked identity-lookup handle in
//! [`access`](crate::access).
//!
//! ```
//! use tenantry_persistence::tenant::{IdentityContext, TenantId, ROOT_TENANT, SUPER_ADMIN};
//!
//! let admin = IdentityContext::new(TenantId::new(ROOT_TENANT), SUPER_ADMIN);
//! assert!(admin.is_super_admin());
//! ```

mod context;
mod id;
pub mod scope;

pub use context::{IdentityContext, IdentityContextBuilder, SUPER_ADMIN, is_super_admin};
pub use id::{ROOT_TENANT, TenantId};
