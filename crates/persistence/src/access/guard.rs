//! Scoped activation of the session row filter.

use std::ops::Deref;

use tracing::error;

use crate::backends::sqlite::SqliteSession;
use crate::error::FilterError;
use crate::tenant::TenantId;

/// An active row filter, removed when the guard is dropped.
///
/// Dropping runs on every exit path of the call that created the guard:
/// normal return, early `?` return, panic unwinding, and the drop of a
/// cancelled future. The guard dereferences to the filtered session.
#[derive(Debug)]
pub struct FilterGuard<'a> {
    session: &'a mut SqliteSession,
}

impl<'a> FilterGuard<'a> {
    /// Installs the row filter for `tenant_id` on `session`.
    pub fn activate(
        session: &'a mut SqliteSession,
        tenant_id: &TenantId,
    ) -> Result<Self, FilterError> {
        session
            .enable_row_filter(tenant_id)
            .map_err(|e| FilterError::ActivationFailed {
                tenant_id: tenant_id.clone(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { session })
    }
}

impl Deref for FilterGuard<'_> {
    type Target = SqliteSession;

    fn deref(&self) -> &SqliteSession {
        self.session
    }
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.disable_row_filter() {
            let err = FilterError::DeactivationFailed {
                message: e.to_string(),
            };
            error!(error = %err, "Row filter teardown failed");
        }
    }
}
