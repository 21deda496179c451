//! Identity context for storage operations.
//!
//! This module defines [`IdentityContext`], the caller identity (tenant and
//! username) that every data-access call receives explicitly.

use std::sync::Arc;

use super::id::{ROOT_TENANT, TenantId};
use crate::error::ValidationError;

/// The reserved super-admin username.
///
/// Only a caller bound to `(ROOT_TENANT, SUPER_ADMIN)` bypasses tenant
/// isolation. The pair is established by the authentication layer and is not
/// configurable.
pub const SUPER_ADMIN: &str = "superadmin";

/// The identity a unit of work runs as.
///
/// `IdentityContext` is an immutable value: it is created once at the start of
/// a unit of work (usually from authentication claims) and handed to every
/// repository call. Changing identity means creating a new context.
///
/// # Examples
///
/// ```
/// use tenantry_persistence::tenant::{IdentityContext, TenantId};
///
/// let ctx = IdentityContext::new(TenantId::new("acme"), "alice");
/// assert_eq!(ctx.tenant_id().as_str(), "acme");
/// assert_eq!(ctx.username(), "alice");
/// assert!(!ctx.is_super_admin());
///
/// assert!(IdentityContext::super_admin().is_super_admin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    tenant_id: TenantId,
    username: Arc<str>,
    correlation_id: Option<Arc<str>>,
}

impl IdentityContext {
    /// Creates a context for the given tenant and username.
    pub fn new(tenant_id: TenantId, username: impl AsRef<str>) -> Self {
        Self {
            tenant_id,
            username: Arc::from(username.as_ref()),
            correlation_id: None,
        }
    }

    /// The context of a caller with no bound identity.
    ///
    /// Its tenant and username are empty; scoped queries issued with it match
    /// no tenant-scoped records.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The reserved super-admin context.
    pub fn super_admin() -> Self {
        Self::new(TenantId::root(), SUPER_ADMIN)
    }

    /// Returns a builder for contexts built from external input.
    pub fn builder() -> IdentityContextBuilder {
        IdentityContextBuilder::new()
    }

    /// Attaches a correlation ID for request tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl AsRef<str>) -> Self {
        self.correlation_id = Some(Arc::from(correlation_id.as_ref()));
        self
    }

    /// Returns the tenant ID.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the username (empty when unbound).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns `true` if both tenant and username are empty.
    pub fn is_anonymous(&self) -> bool {
        self.tenant_id.is_empty() && self.username.is_empty()
    }

    /// Returns `true` for the reserved super-admin identity.
    pub fn is_super_admin(&self) -> bool {
        is_super_admin(self.tenant_id.as_str(), &self.username)
    }
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new(TenantId::default(), "")
    }
}

/// Pure super-admin check over a raw `(tenant, username)` pair.
pub fn is_super_admin(tenant_id: &str, username: &str) -> bool {
    tenant_id == ROOT_TENANT && username == SUPER_ADMIN
}

/// Builder for identity contexts with validation.
///
/// Used when constructing contexts from external input such as token claims.
#[derive(Debug, Default)]
pub struct IdentityContextBuilder {
    tenant_id: Option<TenantId>,
    username: Option<String>,
    correlation_id: Option<String>,
}

impl IdentityContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant ID.
    pub fn tenant_id(mut self, tenant_id: impl Into<TenantId>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Builds the context, rejecting a missing or blank tenant.
    pub fn build(self) -> Result<IdentityContext, ValidationError> {
        let tenant_id = self
            .tenant_id
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ValidationError::MissingRequiredField {
                field: "tenant_id".to_string(),
            })?;

        let mut ctx = IdentityContext::new(tenant_id, self.username.unwrap_or_default());
        if let Some(correlation_id) = self.correlation_id {
            ctx = ctx.with_correlation_id(correlation_id);
        }
        Ok(ctx)
    }
}
