//! The composition root.
//!
//! A [`RecordStore`] owns the storage backend and the process-wide identifier
//! generator, and hands out one [`AccessInterceptor`] per record type. Every
//! repository created from the same store shares both.
//!
//! ```
//! use tenantry_persistence::store::{RecordStore, StoreConfig};
//!
//! let store = RecordStore::open(StoreConfig::default()).unwrap();
//! assert!(store.backend().is_memory());
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::AccessInterceptor;
use crate::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use crate::error::{StorageResult, ValidationError};
use crate::ids::{IdGenerator, IdGeneratorConfig};
use crate::query::{PagingConfig, QueryEngine};
use crate::record::{Record, RecordLifecycle};

/// Configuration of a [`RecordStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection pool and pragma settings.
    #[serde(default)]
    pub sqlite: SqliteBackendConfig,

    /// Identifier generator settings.
    #[serde(default)]
    pub ids: IdGeneratorConfig,

    /// Page size limits.
    #[serde(default)]
    pub paging: PagingConfig,
}

fn default_database() -> String {
    ":memory:".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            sqlite: SqliteBackendConfig::default(),
            ids: IdGeneratorConfig::default(),
            paging: PagingConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Checks the settings that cannot be corrected at runtime.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.database.trim().is_empty() {
            return Err(invalid("database path cannot be empty"));
        }
        if self.sqlite.max_connections == 0 {
            return Err(invalid("max_connections cannot be 0"));
        }
        if self.paging.default_page_size == 0 {
            return Err(invalid("default page size cannot be 0"));
        }
        if self.paging.default_page_size > self.paging.max_page_size {
            return Err(invalid("default page size cannot exceed max page size"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ValidationError {
    ValidationError::InvalidConfig {
        message: message.to_string(),
    }
}

/// Shared backend and identifier generator for all repositories.
#[derive(Debug, Clone)]
pub struct RecordStore {
    backend: Arc<SqliteBackend>,
    ids: Arc<IdGenerator>,
    paging: PagingConfig,
}

impl RecordStore {
    /// Opens the database described by `config` and initializes its schema.
    pub fn open(config: StoreConfig) -> StorageResult<Self> {
        config.validate()?;
        let ids = Arc::new(IdGenerator::new(config.ids.clone())?);
        let backend = SqliteBackend::with_config(&config.database, config.sqlite.clone())?;
        backend.init_schema()?;

        info!(
            database = %config.database,
            datacenter_id = config.ids.datacenter_id,
            worker_id = config.ids.worker_id,
            "Record store opened"
        );

        Ok(Self {
            backend: Arc::new(backend),
            ids,
            paging: config.paging,
        })
    }

    /// Opens a fresh in-memory store with default settings.
    pub fn in_memory() -> StorageResult<Self> {
        Self::open(StoreConfig::default())
    }

    /// Returns the tenant-isolated repository for `R`.
    pub fn repository<R: Record>(&self) -> AccessInterceptor<R, SqliteBackend> {
        let engine = QueryEngine::new(
            RecordLifecycle::new(Arc::clone(&self.ids)),
            self.paging.clone(),
        );
        AccessInterceptor::new(engine, Arc::clone(&self.backend))
    }

    /// Returns the shared identifier generator.
    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &Arc<SqliteBackend> {
        &self.backend
    }
}
