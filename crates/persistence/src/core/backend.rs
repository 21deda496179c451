//! Session acquisition.

use std::sync::Arc;

use crate::backends::sqlite::SqliteSession;
use crate::error::BackendError;

/// Hands out storage sessions to repository calls.
///
/// Each repository call checks out one session, installs its row filter on
/// it, and returns it when the call ends. Implementations must hand out
/// sessions that are not shared with any concurrent call.
pub trait SessionSource: Send + Sync + 'static {
    /// Checks out a session.
    fn open_session(&self) -> Result<SqliteSession, BackendError>;
}

impl<T: SessionSource> SessionSource for Arc<T> {
    fn open_session(&self) -> Result<SqliteSession, BackendError> {
        (**self).open_session()
    }
}
