//! The generic query engine.
//!
//! [`QueryEngine`] implements every repository operation for one record type
//! against a [`SqliteSession`]. It applies its own tenant predicate on top of
//! whatever row filter the session carries: for a tenant-scoped record type
//! and a caller other than the super-admin, every predicate is combined with
//! `tenantId == <caller tenant>` before it is lowered to SQL.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::backends::sqlite::query_builder::{
    SqlFragment, format_timestamp, lower_predicate, lower_sort,
};
use crate::backends::sqlite::{RecordRow, RecordTable, SqliteSession, Window};
use crate::error::{
    BackendError, ResourceError, StorageError, StorageResult, TenantError, ValidationError,
};
use crate::record::{MetaField, Record, RecordLifecycle, RecordMeta};
use crate::tenant::{IdentityContext, TenantId};

use super::page::{Page, PageRequest, PagingConfig};
use super::predicate::Predicate;
use super::sort::Sort;

/// Whether the engine adds its tenant predicate to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoping {
    /// Restrict non-super-admin callers to their tenant.
    Enforced,
    /// No tenant predicate; reserved for identity-resolution lookups.
    Bypassed,
}

/// CRUD and query operations for one record type.
#[derive(Debug)]
pub struct QueryEngine<R> {
    lifecycle: RecordLifecycle,
    paging: PagingConfig,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for QueryEngine<R> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            paging: self.paging.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> QueryEngine<R> {
    /// Creates an engine for `R`.
    pub fn new(lifecycle: RecordLifecycle, paging: PagingConfig) -> Self {
        Self {
            lifecycle,
            paging,
            _record: PhantomData,
        }
    }

    /// Returns the lifecycle hooks.
    pub fn lifecycle(&self) -> &RecordLifecycle {
        &self.lifecycle
    }

    /// Returns the paging limits.
    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    /// Adds the caller's tenant term to `predicate` where it applies.
    pub fn scoped_predicate(
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: Predicate,
    ) -> Predicate {
        if R::SCOPE.is_tenant() && scoping == Scoping::Enforced && !ctx.is_super_admin() {
            predicate.and(Predicate::eq(MetaField::TenantId.name(), ctx.tenant_id()))
        } else {
            predicate
        }
    }

    /// Reads a record by id.
    pub fn get_by_id(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        id: i64,
    ) -> StorageResult<Option<R>> {
        let filter = self.filter(ctx, scoping, Predicate::eq(MetaField::Id.name(), id))?;
        let mut rows = session.select(table::<R>(), &filter, "", None)?;
        rows.pop().map(from_row::<R>).transpose()
    }

    /// Reads the visible records among `ids`.
    pub fn get_by_ids(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        ids: &[i64],
    ) -> StorageResult<Vec<R>> {
        let predicate = Predicate::in_list(MetaField::Id.name(), ids.iter().copied());
        self.list_sorted(session, ctx, scoping, &predicate, &Sort::unsorted())
    }

    /// Lists every visible record.
    pub fn list_all(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
    ) -> StorageResult<Vec<R>> {
        self.list_by_predicate(session, ctx, scoping, &Predicate::True)
    }

    /// Lists visible records matching `predicate`.
    pub fn list_by_predicate(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: &Predicate,
    ) -> StorageResult<Vec<R>> {
        self.list_sorted(session, ctx, scoping, predicate, &Sort::unsorted())
    }

    /// Lists visible records matching `predicate` in `sort` order.
    pub fn list_sorted(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: &Predicate,
        sort: &Sort,
    ) -> StorageResult<Vec<R>> {
        let filter = self.filter(ctx, scoping, predicate.clone())?;
        let order_by = lower_sort(&sort.resolve::<R>());
        session
            .select(table::<R>(), &filter, &order_by, None)?
            .into_iter()
            .map(from_row::<R>)
            .collect()
    }

    /// Returns one page plus the total match count.
    ///
    /// The same filtered predicate runs twice: once windowed for the items,
    /// once counted for the total.
    pub fn page(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: &Predicate,
        request: PageRequest,
        sort: &Sort,
    ) -> StorageResult<Page<R>> {
        let request = request.normalized(&self.paging);
        let filter = self.filter(ctx, scoping, predicate.clone())?;
        let order_by = lower_sort(&sort.resolve::<R>());
        let window = Window {
            limit: request.page_size as u64,
            offset: request.offset(),
        };

        let items = session
            .select(table::<R>(), &filter, &order_by, Some(window))?
            .into_iter()
            .map(from_row::<R>)
            .collect::<StorageResult<Vec<R>>>()?;
        let total = session.count(table::<R>(), &filter)?;

        debug!(
            kind = R::KIND,
            page = request.page_number,
            size = request.page_size,
            total,
            "Served page"
        );

        Ok(Page {
            items,
            total,
            page_number: request.page_number,
            page_size: request.page_size,
        })
    }

    /// Counts visible records matching `predicate`.
    pub fn count(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: &Predicate,
    ) -> StorageResult<u64> {
        let filter = self.filter(ctx, scoping, predicate.clone())?;
        session.count(table::<R>(), &filter)
    }

    /// Returns `true` if a visible record matches `predicate`.
    pub fn exists(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: &Predicate,
    ) -> StorageResult<bool> {
        let filter = self.filter(ctx, scoping, predicate.clone())?;
        session.exists(table::<R>(), &filter)
    }

    /// Creates or updates `record`, running the lifecycle hooks first.
    pub fn save(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        mut record: R,
    ) -> StorageResult<R> {
        session.transaction(move || {
            let existing = match record.id() {
                Some(id) => self.get_by_id(session, ctx, scoping, id)?.map(|r| (id, r)),
                None => None,
            };

            match existing {
                Some((id, stored)) => {
                    self.lifecycle.on_update(ctx, &mut record, stored.meta())?;
                    let row = to_row(&record)?;
                    let target = self.filter(ctx, scoping, Predicate::eq(MetaField::Id.name(), id))?;
                    if !session.update(table::<R>(), &row, &target)? {
                        return Err(ResourceError::NotFound {
                            kind: R::KIND.to_string(),
                            id,
                        }
                        .into());
                    }
                    debug!(kind = R::KIND, id, "Updated record");
                }
                None => {
                    if let Some(id) = record.id() {
                        self.reject_hidden_id(session, ctx, id)?;
                    }
                    self.lifecycle.on_create(ctx, &mut record)?;
                    let row = to_row(&record)?;
                    session.insert(table::<R>(), &row)?;
                    debug!(kind = R::KIND, id = row.id, "Created record");
                }
            }
            Ok(record)
        })
    }

    /// Deletes a visible record. Returns `false` if none had the id.
    pub fn delete_by_id(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        scoping: Scoping,
        id: i64,
    ) -> StorageResult<bool> {
        let target = self.filter(ctx, scoping, Predicate::eq(MetaField::Id.name(), id))?;
        let deleted = session.delete(table::<R>(), &target)? > 0;
        if deleted {
            debug!(kind = R::KIND, id, "Deleted record");
        }
        Ok(deleted)
    }

    fn filter(
        &self,
        ctx: &IdentityContext,
        scoping: Scoping,
        predicate: Predicate,
    ) -> StorageResult<SqlFragment> {
        let scoped = Self::scoped_predicate(ctx, scoping, predicate);
        Ok(lower_predicate::<R>(&scoped)?)
    }

    /// Fails if `id` exists but is not visible to the caller.
    fn reject_hidden_id(
        &self,
        session: &SqliteSession,
        ctx: &IdentityContext,
        id: i64,
    ) -> StorageResult<()> {
        if session.find_any(R::KIND, id)?.is_some() {
            warn!(
                kind = R::KIND,
                id,
                tenant = %ctx.tenant_id(),
                "Rejected write to a record outside the caller's tenant"
            );
            return Err(TenantError::AccessDenied {
                tenant_id: ctx.tenant_id().clone(),
                kind: R::KIND.to_string(),
                id,
            }
            .into());
        }
        Ok(())
    }
}

fn table<R: Record>() -> RecordTable<'static> {
    RecordTable {
        kind: R::KIND,
        tenant_scoped: R::SCOPE.is_tenant(),
    }
}

fn to_row<R: Record>(record: &R) -> StorageResult<RecordRow> {
    let meta = record.meta();
    let id = meta.id.ok_or_else(|| missing("id"))?;
    let created_at = meta.created_at.ok_or_else(|| missing("createdAt"))?;
    let updated_at = meta.updated_at.ok_or_else(|| missing("updatedAt"))?;

    Ok(RecordRow {
        id,
        tenant_id: meta.tenant_id.as_ref().map(|t| t.as_str().to_string()),
        created_at: format_timestamp(&created_at),
        updated_at: format_timestamp(&updated_at),
        created_by: meta.created_by.clone(),
        updated_by: meta.updated_by.clone(),
        data: serde_json::to_string(record)?,
    })
}

fn from_row<R: Record>(row: RecordRow) -> StorageResult<R> {
    let mut record: R = serde_json::from_str(&row.data)?;
    *record.meta_mut() = RecordMeta {
        id: Some(row.id),
        tenant_id: row.tenant_id.map(TenantId::new),
        created_at: Some(parse_timestamp(&row.created_at)?),
        updated_at: Some(parse_timestamp(&row.updated_at)?),
        created_by: row.created_by,
        updated_by: row.updated_by,
    };
    Ok(record)
}

fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!("invalid stored timestamp '{}': {}", s, e),
            })
        })
}

fn missing(field: &str) -> StorageError {
    ValidationError::MissingRequiredField {
        field: field.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backends::sqlite::SqliteBackend;
    use crate::ids::{IdGenerator, IdGeneratorConfig};
    use crate::record::RecordScope;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Item {
        #[serde(skip)]
        meta: RecordMeta,
        name: String,
    }

    impl Item {
        fn named(name: &str) -> Self {
            Self {
                meta: RecordMeta::default(),
                name: name.to_string(),
            }
        }
    }

    impl Record for Item {
        const KIND: &'static str = "item";
        const SCOPE: RecordScope = RecordScope::Tenant;
        const FIELDS: &'static [&'static str] = &["name"];

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    fn setup() -> (SqliteBackend, QueryEngine<Item>) {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        let ids = Arc::new(IdGenerator::new(IdGeneratorConfig::default()).unwrap());
        let engine = QueryEngine::new(RecordLifecycle::new(ids), PagingConfig::default());
        (backend, engine)
    }

    fn ctx(tenant: &str) -> IdentityContext {
        IdentityContext::new(TenantId::new(tenant), "tester")
    }

    #[test]
    fn test_scoped_predicate_adds_tenant_term() {
        let scoped = QueryEngine::<Item>::scoped_predicate(&ctx("a"), Scoping::Enforced, Predicate::True);
        assert_eq!(scoped, Predicate::eq("tenantId", "a"));

        let admin = QueryEngine::<Item>::scoped_predicate(
            &IdentityContext::super_admin(),
            Scoping::Enforced,
            Predicate::True,
        );
        assert_eq!(admin, Predicate::True);

        let bypassed = QueryEngine::<Item>::scoped_predicate(&ctx("a"), Scoping::Bypassed, Predicate::True);
        assert_eq!(bypassed, Predicate::True);
    }

    #[test]
    fn test_engine_scopes_without_row_filter() {
        let (backend, engine) = setup();
        let session = backend.session().unwrap();
        engine.save(&session, &ctx("a"), Scoping::Enforced, Item::named("a1")).unwrap();
        engine.save(&session, &ctx("b"), Scoping::Enforced, Item::named("b1")).unwrap();

        // No row filter installed: the engine's own tenant term isolates.
        let listed = engine.list_all(&session, &ctx("a"), Scoping::Enforced).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a1");

        let all = engine
            .list_all(&session, &IdentityContext::super_admin(), Scoping::Enforced)
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_save_round_trips_metadata() {
        let (backend, engine) = setup();
        let session = backend.session().unwrap();
        let saved = engine.save(&session, &ctx("a"), Scoping::Enforced, Item::named("x")).unwrap();

        let loaded = engine
            .get_by_id(&session, &ctx("a"), Scoping::Enforced, saved.meta.id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.meta, saved.meta);
        assert_eq!(loaded.name, "x");
    }

    #[test]
    fn test_update_of_foreign_id_is_denied() {
        let (backend, engine) = setup();
        let session = backend.session().unwrap();
        let theirs = engine.save(&session, &ctx("b"), Scoping::Enforced, Item::named("b1")).unwrap();

        let mut forged = Item::named("stolen");
        forged.meta.id = theirs.meta.id;
        let err = engine.save(&session, &ctx("a"), Scoping::Enforced, forged).unwrap_err();
        assert!(matches!(err, StorageError::Tenant(TenantError::AccessDenied { .. })));

        let still = engine
            .get_by_id(&session, &ctx("b"), Scoping::Enforced, theirs.meta.id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(still.name, "b1");
    }

    #[test]
    fn test_unknown_predicate_field_is_an_error() {
        let (backend, engine) = setup();
        let session = backend.session().unwrap();
        let err = engine
            .count(&session, &ctx("a"), Scoping::Enforced, &Predicate::eq("colour", "red"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::UnknownField { .. })));
    }

    #[test]
    fn test_delete_is_scoped() {
        let (backend, engine) = setup();
        let session = backend.session().unwrap();
        let theirs = engine.save(&session, &ctx("b"), Scoping::Enforced, Item::named("b1")).unwrap();
        let id = theirs.meta.id.unwrap();

        assert!(!engine.delete_by_id(&session, &ctx("a"), Scoping::Enforced, id).unwrap());
        assert!(engine.delete_by_id(&session, &ctx("b"), Scoping::Enforced, id).unwrap());
        assert!(!engine.exists(&session, &ctx("b"), Scoping::Enforced, &Predicate::True).unwrap());
    }
}
