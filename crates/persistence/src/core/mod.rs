//! Core traits of the persistence layer.
//!
//! - [`Repository`] - Tenant-isolated CRUD and query operations, the surface
//!   business services consume
//! - [`SessionSource`] - Storage session acquisition, the seam between the
//!   access layer and the database driver
//!
//! ```text
//! Repository<R>
//!     └── AccessInterceptor<R, S: SessionSource>
//!             └── QueryEngine<R> ── SqliteSession (row filter)
//! ```

pub mod backend;
pub mod repository;

pub use backend::SessionSource;
pub use repository::Repository;
