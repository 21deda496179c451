//! Creation and update hooks for records.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::warn;

use crate::error::{StorageResult, TenantError, ValidationError};
use crate::ids::IdGenerator;
use crate::tenant::{IdentityContext, TenantId};

use super::meta::{Record, RecordMeta};

/// Stamps identity, tenant, timestamps and audit users onto records.
///
/// `on_create` runs before a record is first written and `on_update` before
/// every later write. Both run inside the storage transaction of the save
/// that triggered them.
#[derive(Debug, Clone)]
pub struct RecordLifecycle {
    ids: Arc<IdGenerator>,
}

impl RecordLifecycle {
    /// Creates lifecycle hooks drawing identifiers from `ids`.
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self { ids }
    }

    /// Returns the identifier generator.
    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// Prepares a record for its first persistence.
    ///
    /// - assigns an id unless the caller chose one
    /// - sets `created_at` and `updated_at` to the same instant
    /// - fills unset audit users from the context username
    /// - stamps unset tenants from the context tenant
    ///
    /// Only the super-admin may create tenant records in a tenant other than
    /// its own.
    pub fn on_create<R: Record>(&self, ctx: &IdentityContext, record: &mut R) -> StorageResult<()> {
        let tenant_id = if R::SCOPE.is_tenant() {
            Some(resolve_create_tenant::<R>(ctx, record.meta().tenant_id.as_ref())?)
        } else {
            None
        };

        let id = match record.meta().id {
            Some(id) => id,
            None => self.ids.next()?,
        };

        let now = now();
        let meta = record.meta_mut();
        meta.id = Some(id);
        meta.tenant_id = tenant_id;
        meta.created_at = Some(now);
        meta.updated_at = Some(now);
        if meta.created_by.is_none() {
            meta.created_by = username(ctx);
        }
        if meta.updated_by.is_none() {
            meta.updated_by = username(ctx);
        }
        Ok(())
    }

    /// Prepares a record for a write over its stored version.
    ///
    /// The owning tenant and creation fields are taken from `stored`. A
    /// record carrying a different tenant than the stored one is rejected.
    /// `updated_by` is filled from the context unless the caller changed it
    /// for this write.
    pub fn on_update<R: Record>(
        &self,
        ctx: &IdentityContext,
        record: &mut R,
        stored: &RecordMeta,
    ) -> StorageResult<()> {
        let id = record.meta().id.or(stored.id).unwrap_or_default();

        if R::SCOPE.is_tenant() {
            if let (Some(requested), Some(current)) = (&record.meta().tenant_id, &stored.tenant_id) {
                if requested != current {
                    warn!(
                        kind = R::KIND,
                        id,
                        stored = %current,
                        requested = %requested,
                        "Rejected change of record tenant"
                    );
                    return Err(TenantError::TenantImmutable {
                        kind: R::KIND.to_string(),
                        id,
                        stored: current.clone(),
                        requested: requested.clone(),
                    }
                    .into());
                }
            }
        }

        let caller_set_updated_by =
            record.meta().updated_by.is_some() && record.meta().updated_by != stored.updated_by;

        let meta = record.meta_mut();
        meta.id = Some(id);
        meta.tenant_id = stored.tenant_id.clone();
        meta.created_at = stored.created_at;
        meta.created_by = stored.created_by.clone();
        meta.updated_at = Some(now());
        if !caller_set_updated_by {
            meta.updated_by = username(ctx).or_else(|| stored.updated_by.clone());
        }
        Ok(())
    }
}

fn resolve_create_tenant<R: Record>(
    ctx: &IdentityContext,
    requested: Option<&TenantId>,
) -> StorageResult<TenantId> {
    let caller = ctx.tenant_id();
    let tenant_id = match requested {
        Some(requested) if !requested.is_empty() => requested.clone(),
        _ => caller.clone(),
    };

    if tenant_id.is_empty() {
        return Err(ValidationError::MissingTenant {
            kind: R::KIND.to_string(),
        }
        .into());
    }

    if &tenant_id != caller && !ctx.is_super_admin() {
        warn!(
            kind = R::KIND,
            caller = %caller,
            target = %tenant_id,
            "Rejected record creation in another tenant"
        );
        return Err(TenantError::CrossTenantWrite {
            caller: caller.clone(),
            target: tenant_id,
            kind: R::KIND.to_string(),
        }
        .into());
    }

    Ok(tenant_id)
}

fn username(ctx: &IdentityContext) -> Option<String> {
    let username = ctx.username();
    (!username.is_empty()).then(|| username.to_string())
}

/// Current time at the precision records are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
