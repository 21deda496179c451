//! Records and their lifecycle.
//!
//! A record type implements [`Record`]: it names its storage kind, whether it
//! is tenant-owned and which business fields may be queried. Persistence
//! metadata lives in [`RecordMeta`] and is stamped by [`RecordLifecycle`].

pub mod lifecycle;
mod meta;

pub use lifecycle::RecordLifecycle;
pub use meta::{FieldRef, MetaField, Record, RecordMeta, RecordScope};
