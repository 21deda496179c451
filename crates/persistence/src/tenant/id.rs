//! Tenant identifier type.
//!
//! This module defines the [`TenantId`] type, an opaque identifier for the
//! tenant that owns a record, and the reserved root tenant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The reserved root tenant identifier.
///
/// Together with [`SUPER_ADMIN`](super::SUPER_ADMIN) it identifies the only
/// caller exempt from tenant isolation.
pub const ROOT_TENANT: &str = "000000";

/// An opaque tenant identifier.
///
/// The empty identifier is what an unbound caller carries; it never matches a
/// persisted record, so queries issued without a tenant see nothing.
///
/// # Examples
///
/// ```
/// use tenantry_persistence::tenant::TenantId;
///
/// let tenant = TenantId::new("acme");
/// assert_eq!(tenant.as_str(), "acme");
/// assert!(!tenant.is_root());
/// assert!(TenantId::root().is_root());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID from the given string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reserved root tenant ID.
    pub fn root() -> Self {
        Self(ROOT_TENANT.to_string())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the reserved root tenant.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_TENANT
    }

    /// Returns `true` if no tenant is set.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({:?})", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_tenant() {
        assert!(TenantId::root().is_root());
        assert!(TenantId::new(ROOT_TENANT).is_root());
        assert!(!TenantId::new("acme").is_root());
    }

    #[test]
    fn test_empty_tenant() {
        assert!(TenantId::default().is_empty());
        assert!(TenantId::new("  ").is_empty());
        assert!(!TenantId::new("acme").is_empty());
    }

    #[test]
    fn test_display_and_debug() {
        let tenant = TenantId::new("acme");
        assert_eq!(tenant.to_string(), "acme");
        assert_eq!(format!("{:?}", tenant), "TenantId(\"acme\")");
    }

    #[test]
    fn test_serde_transparent() {
        let tenant = TenantId::new("acme");
        let json = serde_json::to_string(&tenant).unwrap();
        assert_eq!(json, "\"acme\"");
        let parsed: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tenant);
    }
}
