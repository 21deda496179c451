//! The repository trait business services program against.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::query::{Page, PageRequest, Predicate, Sort};
use crate::record::Record;
use crate::tenant::IdentityContext;

/// Tenant-isolated CRUD and query operations for one record type.
///
/// Every operation takes the caller's [`IdentityContext`] as its first
/// parameter. For tenant-scoped record types, a caller other than the
/// super-admin only ever reads, counts, updates or deletes records of its own
/// tenant, and only creates records in its own tenant.
///
/// # Example
///
/// ```ignore
/// use tenantry_persistence::core::Repository;
/// use tenantry_persistence::query::{PageRequest, Predicate, Sort};
/// use tenantry_persistence::tenant::{IdentityContext, TenantId};
///
/// async fn example<R: Repository<Note>>(notes: &R) -> StorageResult<()> {
///     let ctx = IdentityContext::new(TenantId::new("acme"), "alice");
///
///     let saved = notes.save(&ctx, Note::new("Quarterly report")).await?;
///     let id = saved.id().unwrap();
///     assert!(notes.get_by_id(&ctx, id).await?.is_some());
///
///     let page = notes
///         .page(&ctx, &Predicate::contains("title", "report"), PageRequest::new(1, 20), &Sort::parse("-createdAt"))
///         .await?;
///     println!("{} of {}", page.items.len(), page.total);
///
///     notes.delete_by_id(&ctx, id).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Reads a record by id.
    ///
    /// Returns `Ok(None)` for ids that do not exist or are not visible to the
    /// caller.
    async fn get_by_id(&self, ctx: &IdentityContext, id: i64) -> StorageResult<Option<R>>;

    /// Reads every visible record among `ids`, in default order.
    async fn get_by_ids(&self, ctx: &IdentityContext, ids: &[i64]) -> StorageResult<Vec<R>>;

    /// Lists every visible record, in default order.
    async fn list_all(&self, ctx: &IdentityContext) -> StorageResult<Vec<R>>;

    /// Lists visible records matching `predicate`, in default order.
    async fn list_by_predicate(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
    ) -> StorageResult<Vec<R>>;

    /// Lists visible records matching `predicate` in `sort` order.
    async fn list_sorted(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
        sort: &Sort,
    ) -> StorageResult<Vec<R>>;

    /// Returns one page of visible records matching `predicate`, with the
    /// total match count.
    async fn page(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
        request: PageRequest,
        sort: &Sort,
    ) -> StorageResult<Page<R>>;

    /// Counts visible records matching `predicate`.
    async fn count(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<u64>;

    /// Returns `true` if a visible record matches `predicate`.
    async fn exists(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<bool>;

    /// Inserts or updates a record, returning it with its metadata stamped.
    ///
    /// A record without an id, or with an id that does not exist yet, is
    /// created. A record whose id is visible to the caller is updated.
    ///
    /// # Errors
    ///
    /// * `StorageError::Tenant(AccessDenied)` - the id belongs to a record the
    ///   caller cannot see
    /// * `StorageError::Tenant(TenantImmutable)` - the record's tenant differs
    ///   from the stored one
    /// * `StorageError::Tenant(CrossTenantWrite)` - creating in another tenant
    async fn save(&self, ctx: &IdentityContext, record: R) -> StorageResult<R>;

    /// Deletes a visible record. Returns `false` if none had the id.
    async fn delete_by_id(&self, ctx: &IdentityContext, id: i64) -> StorageResult<bool>;
}
