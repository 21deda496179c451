//! Tenant filter interception around repository calls.
//!
//! [`AccessInterceptor`] is a decorator composed around a
//! [`QueryEngine`](crate::query::QueryEngine) at construction time. For every
//! call it decides, in this order:
//!
//! 1. the caller is the super-admin: run unfiltered;
//! 2. the call is an identity-resolution lookup issued through
//!    [`TenantBypass`]: run unfiltered;
//! 3. otherwise: install the session row filter for the caller's tenant, run
//!    the call, and remove the filter whatever the outcome.
//!
//! If the row filter cannot be installed the call fails with
//! [`FilterError::ActivationFailed`](crate::error::FilterError::ActivationFailed).
//! There is no unfiltered fallback.

mod guard;
mod interceptor;

use std::fmt;

use crate::query::Scoping;
use crate::tenant::{IdentityContext, TenantId};

pub use guard::FilterGuard;
pub use interceptor::{AccessInterceptor, TenantBypass};

/// Repository operations, as recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `get_by_id`
    GetById,
    /// `get_by_ids`
    GetByIds,
    /// `list_all`
    ListAll,
    /// `list_by_predicate`
    ListByPredicate,
    /// `list_sorted`
    ListSorted,
    /// `page`
    Page,
    /// `count`
    Count,
    /// `exists`
    Exists,
    /// `save`
    Save,
    /// `delete_by_id`
    DeleteById,
}

impl Operation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetById => "get_by_id",
            Operation::GetByIds => "get_by_ids",
            Operation::ListAll => "list_all",
            Operation::ListByPredicate => "list_by_predicate",
            Operation::ListSorted => "list_sorted",
            Operation::Page => "page",
            Operation::Count => "count",
            Operation::Exists => "exists",
            Operation::Save => "save",
            Operation::DeleteById => "delete_by_id",
        }
    }

    /// Returns `true` for operations that modify records.
    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Save | Operation::DeleteById)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a call is isolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// The super-admin runs unfiltered.
    SuperAdmin,
    /// An identity-resolution lookup runs unfiltered.
    Bypass,
    /// The session row filter is installed for this tenant.
    Filtered(TenantId),
}

impl FilterDecision {
    /// Decides how a call by `ctx` is isolated.
    pub fn decide(ctx: &IdentityContext, bypass: bool) -> Self {
        if ctx.is_super_admin() {
            FilterDecision::SuperAdmin
        } else if bypass {
            FilterDecision::Bypass
        } else {
            FilterDecision::Filtered(ctx.tenant_id().clone())
        }
    }

    /// Whether the engine adds its own tenant term.
    pub fn scoping(&self) -> Scoping {
        match self {
            FilterDecision::Bypass => Scoping::Bypassed,
            FilterDecision::SuperAdmin | FilterDecision::Filtered(_) => Scoping::Enforced,
        }
    }

    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDecision::SuperAdmin => "super_admin",
            FilterDecision::Bypass => "bypass",
            FilterDecision::Filtered(_) => "filtered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_order() {
        let admin = IdentityContext::super_admin();
        assert_eq!(FilterDecision::decide(&admin, false), FilterDecision::SuperAdmin);
        assert_eq!(FilterDecision::decide(&admin, true), FilterDecision::SuperAdmin);

        let alice = IdentityContext::new(TenantId::new("acme"), "alice");
        assert_eq!(FilterDecision::decide(&alice, true), FilterDecision::Bypass);
        assert_eq!(
            FilterDecision::decide(&alice, false),
            FilterDecision::Filtered(TenantId::new("acme"))
        );
    }

    #[test]
    fn test_anonymous_caller_is_filtered() {
        let decision = FilterDecision::decide(&IdentityContext::anonymous(), false);
        assert_eq!(decision, FilterDecision::Filtered(TenantId::default()));
        assert_eq!(decision.scoping(), Scoping::Enforced);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::DeleteById.to_string(), "delete_by_id");
        assert!(Operation::Save.is_write());
        assert!(!Operation::Page.is_write());
    }
}
