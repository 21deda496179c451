//! Unit-of-work identity binding.
//!
//! [`bind`] makes an [`IdentityContext`] visible to everything the given
//! future awaits, and only to that. The binding lives in a tokio task-local,
//! so it is never inherited by work handed to `tokio::spawn` or a blocking
//! pool: background jobs must bind their own identity.
//!
//! The binding is for callers. Repositories never read it: every
//! [`Repository`](crate::core::Repository) operation takes the caller's
//! context as an explicit argument. A service running inside a binding
//! passes [`current`] along:
//!
//! ```ignore
//! scope::bind(ctx, async {
//!     notes.list_all(&scope::current()).await
//! })
//! .await
//! ```
//!
//! Bindings nest. An inner [`bind`] shadows the outer one for its extent and
//! the outer binding is visible again once the inner future completes, is
//! dropped, or panics.
//!
//! ```
//! use tenantry_persistence::tenant::{scope, IdentityContext, TenantId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ctx = IdentityContext::new(TenantId::new("acme"), "alice");
//! scope::bind(ctx, async {
//!     assert_eq!(scope::current_tenant().as_str(), "acme");
//!     assert_eq!(scope::current_username(), "alice");
//! })
//! .await;
//!
//! // Outside any binding the accessors return empty defaults.
//! assert!(scope::current_tenant().is_empty());
//! # }
//! ```

use std::future::Future;

use super::context::IdentityContext;
use super::id::TenantId;

tokio::task_local! {
    static IDENTITY: IdentityContext;
}

/// Runs `work` with `ctx` bound as the current identity.
pub async fn bind<F>(ctx: IdentityContext, work: F) -> F::Output
where
    F: Future,
{
    IDENTITY.scope(ctx, work).await
}

/// Runs the synchronous closure `work` with `ctx` bound as the current identity.
pub fn bind_sync<T>(ctx: IdentityContext, work: impl FnOnce() -> T) -> T {
    IDENTITY.sync_scope(ctx, work)
}

/// Returns the bound identity, or [`IdentityContext::anonymous`] when unbound.
pub fn current() -> IdentityContext {
    IDENTITY.try_with(Clone::clone).unwrap_or_default()
}

/// Returns the bound tenant, or an empty tenant when unbound.
pub fn current_tenant() -> TenantId {
    IDENTITY
        .try_with(|ctx| ctx.tenant_id().clone())
        .unwrap_or_default()
}

/// Returns the bound username, or an empty string when unbound.
pub fn current_username() -> String {
    IDENTITY
        .try_with(|ctx| ctx.username().to_string())
        .unwrap_or_default()
}

/// Returns `true` if the bound identity is the super-admin.
pub fn is_super_admin() -> bool {
    IDENTITY
        .try_with(IdentityContext::is_super_admin)
        .unwrap_or(false)
}

/// Returns `true` if an identity is bound in the current task.
pub fn is_bound() -> bool {
    IDENTITY.try_with(|_| ()).is_ok()
}
