//! SQLite backend implementation.
//!
//! All record kinds share one table. Metadata is stored in columns and the
//! business fields of each record as a JSON document:
//!
//! ```sql
//! CREATE TABLE records (
//!     kind TEXT NOT NULL,
//!     id INTEGER NOT NULL,
//!     tenant_id TEXT,          -- NULL for global kinds
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     created_by TEXT,
//!     updated_by TEXT,
//!     data TEXT NOT NULL,      -- JSON document
//!     PRIMARY KEY (kind, id)
//! );
//! ```
//!
//! A trigger rejects any statement that changes `tenant_id` of an existing
//! row.
//!
//! # Example
//!
//! ```
//! use tenantry_persistence::backends::sqlite::SqliteBackend;
//! use tenantry_persistence::tenant::TenantId;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let mut session = backend.session()?;
//! session.enable_row_filter(&TenantId::new("acme"))?;
//! assert!(session.row_filter().is_some());
//! session.disable_row_filter()?;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod query_builder;
mod schema;
mod session;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
pub use session::{RecordRow, RecordTable, RowFilter, SqliteSession, Window};
