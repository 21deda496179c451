//! Record metadata and the [`Record`] trait.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::tenant::TenantId;

/// Whether records of a kind belong to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    /// Shared by all tenants (a plain record).
    Global,
    /// Owned by exactly one tenant (a tenant record).
    Tenant,
}

impl RecordScope {
    /// Returns `true` for tenant-owned records.
    pub fn is_tenant(self) -> bool {
        matches!(self, RecordScope::Tenant)
    }
}

/// Persistence metadata carried by every record.
///
/// All fields are unset on a record that has never been saved. The lifecycle
/// hooks fill them on first persistence; `id` and `tenant_id` never change
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMeta {
    /// Time-ordered identifier, assigned once.
    pub id: Option<i64>,
    /// Owning tenant (tenant records only), assigned once.
    pub tenant_id: Option<TenantId>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Username that created the record.
    pub created_by: Option<String>,
    /// Username that last modified the record.
    pub updated_by: Option<String>,
}

impl RecordMeta {
    /// Metadata for a record with a caller-chosen id.
    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// A persistable record type.
///
/// Business fields are stored as a JSON document, so implementors derive
/// `Serialize`/`Deserialize` and keep their [`RecordMeta`] out of it with
/// `#[serde(skip)]`. Metadata is stored in dedicated columns and restored on
/// load.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use tenantry_persistence::record::{Record, RecordMeta, RecordScope};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Role {
///     #[serde(skip)]
///     meta: RecordMeta,
///     name: String,
/// }
///
/// impl Record for Role {
///     const KIND: &'static str = "role";
///     const SCOPE: RecordScope = RecordScope::Tenant;
///     const FIELDS: &'static [&'static str] = &["name"];
///
///     fn meta(&self) -> &RecordMeta {
///         &self.meta
///     }
///
///     fn meta_mut(&mut self) -> &mut RecordMeta {
///         &mut self.meta
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Storage discriminator for this record type.
    const KIND: &'static str;

    /// Whether records of this type are tenant-owned.
    const SCOPE: RecordScope;

    /// Business fields that predicates and sorts may reference.
    ///
    /// Names must be plain identifiers (`[A-Za-z0-9_]`).
    const FIELDS: &'static [&'static str];

    /// Returns the persistence metadata.
    fn meta(&self) -> &RecordMeta;

    /// Returns the persistence metadata for modification.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Returns the record id, if assigned.
    fn id(&self) -> Option<i64> {
        self.meta().id
    }
}

/// A metadata field exposed to predicates and sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    /// `id`
    Id,
    /// `tenantId`
    TenantId,
    /// `createdAt`
    CreatedAt,
    /// `updatedAt`
    UpdatedAt,
    /// `createdBy`
    CreatedBy,
    /// `updatedBy`
    UpdatedBy,
}

impl MetaField {
    /// Every metadata field.
    pub const ALL: [MetaField; 6] = [
        MetaField::Id,
        MetaField::TenantId,
        MetaField::CreatedAt,
        MetaField::UpdatedAt,
        MetaField::CreatedBy,
        MetaField::UpdatedBy,
    ];

    /// The name callers use in predicates and sorts.
    pub fn name(self) -> &'static str {
        match self {
            MetaField::Id => "id",
            MetaField::TenantId => "tenantId",
            MetaField::CreatedAt => "createdAt",
            MetaField::UpdatedAt => "updatedAt",
            MetaField::CreatedBy => "createdBy",
            MetaField::UpdatedBy => "updatedBy",
        }
    }

    /// The storage column.
    pub fn column(self) -> &'static str {
        match self {
            MetaField::Id => "id",
            MetaField::TenantId => "tenant_id",
            MetaField::CreatedAt => "created_at",
            MetaField::UpdatedAt => "updated_at",
            MetaField::CreatedBy => "created_by",
            MetaField::UpdatedBy => "updated_by",
        }
    }

    /// Looks up a metadata field by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// A resolved field reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef {
    /// A metadata column.
    Meta(MetaField),
    /// A business field inside the JSON document.
    Data(&'static str),
}

impl FieldRef {
    /// Resolves `name` against the metadata fields and `R::FIELDS`.
    ///
    /// Returns `None` for blank, unknown or malformed names.
    pub fn resolve<R: Record>(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(meta) = MetaField::from_name(name) {
            if meta == MetaField::TenantId && !R::SCOPE.is_tenant() {
                return None;
            }
            return Some(FieldRef::Meta(meta));
        }
        R::FIELDS
            .iter()
            .copied()
            .find(|field| *field == name && is_identifier(field))
            .map(FieldRef::Data)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
