//! Database backend implementations.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | SQLite | Embedded database with in-memory and file modes |
//!
//! # Example
//!
//! ```no_run
//! use tenantry_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory SQLite backend
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Or use a file-based database
//! let backend = SqliteBackend::open("./data/records.db")?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```

pub mod sqlite;
