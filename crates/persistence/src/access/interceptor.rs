//! The access interceptor and its bypass handle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug_span, info};

use crate::backends::sqlite::{SqliteBackend, SqliteSession};
use crate::core::{Repository, SessionSource};
use crate::error::{FilterError, StorageResult};
use crate::query::{Page, PageRequest, Predicate, QueryEngine, Scoping, Sort};
use crate::record::Record;
use crate::tenant::IdentityContext;

use super::guard::FilterGuard;
use super::{FilterDecision, Operation};

/// Wraps a [`QueryEngine`] with the session row filter.
///
/// This is the [`Repository`] implementation business services use. Each
/// call checks out its own session from `S`, so filters of concurrent calls
/// never meet.
#[derive(Debug)]
pub struct AccessInterceptor<R, S = SqliteBackend> {
    engine: QueryEngine<R>,
    sessions: Arc<S>,
}

impl<R: Record, S: SessionSource> AccessInterceptor<R, S> {
    /// Composes the interceptor around `engine`.
    pub fn new(engine: QueryEngine<R>, sessions: Arc<S>) -> Self {
        Self { engine, sessions }
    }

    /// Returns the wrapped engine.
    pub fn engine(&self) -> &QueryEngine<R> {
        &self.engine
    }

    /// Returns a read-only handle whose calls skip tenant isolation.
    ///
    /// Only for identity-resolution lookups issued before the caller's
    /// tenant membership is known, such as finding a user by login name
    /// during authentication. Every call through the handle is logged.
    pub fn bypass_tenant(&self) -> TenantBypass<'_, R, S> {
        TenantBypass { inner: self }
    }

    fn run<T>(
        &self,
        operation: Operation,
        ctx: &IdentityContext,
        bypass: bool,
        work: impl FnOnce(&QueryEngine<R>, &SqliteSession, Scoping) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let decision = FilterDecision::decide(ctx, bypass);
        let span = debug_span!(
            "repository",
            operation = %operation,
            write = operation.is_write(),
            kind = R::KIND,
            tenant = %ctx.tenant_id(),
            decision = decision.as_str(),
            correlation_id = ctx.correlation_id().unwrap_or(""),
        );
        let _entered = span.enter();

        match decision {
            FilterDecision::Filtered(tenant_id) => {
                let mut session =
                    self.sessions
                        .open_session()
                        .map_err(|e| FilterError::ActivationFailed {
                            tenant_id: tenant_id.clone(),
                            message: format!("no storage session available: {}", e),
                            source: Some(Box::new(e)),
                        })?;
                let guard = FilterGuard::activate(&mut session, &tenant_id)?;
                work(&self.engine, &guard, Scoping::Enforced)
            }
            decision => {
                if decision == FilterDecision::Bypass {
                    info!(
                        operation = %operation,
                        kind = R::KIND,
                        username = ctx.username(),
                        "Tenant isolation bypassed for identity lookup"
                    );
                }
                let session = self.sessions.open_session()?;
                work(&self.engine, &session, decision.scoping())
            }
        }
    }
}

impl<R, S> Clone for AccessInterceptor<R, S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[async_trait]
impl<R: Record, S: SessionSource> Repository<R> for AccessInterceptor<R, S> {
    async fn get_by_id(&self, ctx: &IdentityContext, id: i64) -> StorageResult<Option<R>> {
        self.run(Operation::GetById, ctx, false, |engine, session, scoping| {
            engine.get_by_id(session, ctx, scoping, id)
        })
    }

    async fn get_by_ids(&self, ctx: &IdentityContext, ids: &[i64]) -> StorageResult<Vec<R>> {
        self.run(Operation::GetByIds, ctx, false, |engine, session, scoping| {
            engine.get_by_ids(session, ctx, scoping, ids)
        })
    }

    async fn list_all(&self, ctx: &IdentityContext) -> StorageResult<Vec<R>> {
        self.run(Operation::ListAll, ctx, false, |engine, session, scoping| {
            engine.list_all(session, ctx, scoping)
        })
    }

    async fn list_by_predicate(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
    ) -> StorageResult<Vec<R>> {
        self.run(
            Operation::ListByPredicate,
            ctx,
            false,
            |engine, session, scoping| engine.list_by_predicate(session, ctx, scoping, predicate),
        )
    }

    async fn list_sorted(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
        sort: &Sort,
    ) -> StorageResult<Vec<R>> {
        self.run(Operation::ListSorted, ctx, false, |engine, session, scoping| {
            engine.list_sorted(session, ctx, scoping, predicate, sort)
        })
    }

    async fn page(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
        request: PageRequest,
        sort: &Sort,
    ) -> StorageResult<Page<R>> {
        self.run(Operation::Page, ctx, false, |engine, session, scoping| {
            engine.page(session, ctx, scoping, predicate, request, sort)
        })
    }

    async fn count(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<u64> {
        self.run(Operation::Count, ctx, false, |engine, session, scoping| {
            engine.count(session, ctx, scoping, predicate)
        })
    }

    async fn exists(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<bool> {
        self.run(Operation::Exists, ctx, false, |engine, session, scoping| {
            engine.exists(session, ctx, scoping, predicate)
        })
    }

    async fn save(&self, ctx: &IdentityContext, record: R) -> StorageResult<R> {
        self.run(Operation::Save, ctx, false, |engine, session, scoping| {
            engine.save(session, ctx, scoping, record)
        })
    }

    async fn delete_by_id(&self, ctx: &IdentityContext, id: i64) -> StorageResult<bool> {
        self.run(Operation::DeleteById, ctx, false, |engine, session, scoping| {
            engine.delete_by_id(session, ctx, scoping, id)
        })
    }
}

/// Read-only repository access that skips tenant isolation.
///
/// Obtained from [`AccessInterceptor::bypass_tenant`].
#[derive(Debug)]
pub struct TenantBypass<'a, R, S = SqliteBackend> {
    inner: &'a AccessInterceptor<R, S>,
}

impl<R: Record, S: SessionSource> TenantBypass<'_, R, S> {
    /// Reads a record by id in any tenant.
    pub async fn get_by_id(&self, ctx: &IdentityContext, id: i64) -> StorageResult<Option<R>> {
        self.inner
            .run(Operation::GetById, ctx, true, |engine, session, scoping| {
                engine.get_by_id(session, ctx, scoping, id)
            })
    }

    /// Lists records matching `predicate` in any tenant.
    pub async fn list_by_predicate(
        &self,
        ctx: &IdentityContext,
        predicate: &Predicate,
    ) -> StorageResult<Vec<R>> {
        self.inner.run(
            Operation::ListByPredicate,
            ctx,
            true,
            |engine, session, scoping| engine.list_by_predicate(session, ctx, scoping, predicate),
        )
    }

    /// Counts records matching `predicate` in any tenant.
    pub async fn count(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<u64> {
        self.inner
            .run(Operation::Count, ctx, true, |engine, session, scoping| {
                engine.count(session, ctx, scoping, predicate)
            })
    }

    /// Returns `true` if a record in any tenant matches `predicate`.
    pub async fn exists(&self, ctx: &IdentityContext, predicate: &Predicate) -> StorageResult<bool> {
        self.inner
            .run(Operation::Exists, ctx, true, |engine, session, scoping| {
                engine.exists(session, ctx, scoping, predicate)
            })
    }
}
