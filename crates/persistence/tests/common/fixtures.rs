//! Record types and identities used across the integration tests.

use serde::{Deserialize, Serialize};

use tenantry_persistence::record::{Record, RecordMeta, RecordScope};
use tenantry_persistence::store::RecordStore;
use tenantry_persistence::tenant::{IdentityContext, ROOT_TENANT, SUPER_ADMIN, TenantId};

/// A tenant-owned note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub meta: RecordMeta,
    pub title: String,
    pub status: String,
    pub priority: i64,
}

impl Note {
    /// Creates an unsaved note with status `open` and priority 0.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            meta: RecordMeta::default(),
            title: title.into(),
            status: "open".to_string(),
            priority: 0,
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the assigned id.
    pub fn id(&self) -> i64 {
        self.meta.id.expect("note has not been saved")
    }
}

impl Record for Note {
    const KIND: &'static str = "note";
    const SCOPE: RecordScope = RecordScope::Tenant;
    const FIELDS: &'static [&'static str] = &["title", "status", "priority"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// A record shared by all tenants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(skip)]
    pub meta: RecordMeta,
    pub name: String,
    pub seats: i64,
}

impl Plan {
    /// Creates an unsaved plan.
    pub fn new(name: impl Into<String>, seats: i64) -> Self {
        Self {
            meta: RecordMeta::default(),
            name: name.into(),
            seats,
        }
    }
}

impl Record for Plan {
    const KIND: &'static str = "plan";
    const SCOPE: RecordScope = RecordScope::Global;
    const FIELDS: &'static [&'static str] = &["name", "seats"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

/// Opens a fresh in-memory store.
pub fn create_store() -> RecordStore {
    RecordStore::in_memory().expect("Failed to open in-memory store")
}

/// An ordinary caller of `tenant`.
pub fn user(tenant: &str, username: &str) -> IdentityContext {
    IdentityContext::new(TenantId::new(tenant), username)
}

/// `alice` of tenant `tenant-a`.
pub fn alice() -> IdentityContext {
    user("tenant-a", "alice")
}

/// `bob` of tenant `tenant-b`.
pub fn bob() -> IdentityContext {
    user("tenant-b", "bob")
}

/// The super-admin.
pub fn super_admin() -> IdentityContext {
    IdentityContext::new(TenantId::new(ROOT_TENANT), SUPER_ADMIN)
}
