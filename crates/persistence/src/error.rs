//! Error types for the persistence layer.
//!
//! Errors are grouped by concern (identifiers, tenant isolation, row filters,
//! record state, validation, backend) and unified under [`StorageError`].
//!
//! # Failure policy
//!
//! Identifier, filter and backend failures are *hard* failures: they must reach
//! the caller as errors and are never converted into empty results. Callers at
//! the edge should surface [`StorageError::public_message`] to end users rather
//! than the `Display` output, which may contain internal detail.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::tenant::TenantId;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Identifier allocation errors
    #[error(transparent)]
    Id(#[from] IdError),

    /// Tenant isolation errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Row filter errors
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Record state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Message shown to end users for hard failures.
pub const RETRY_LATER_MESSAGE: &str = "the service is temporarily unavailable, please retry later";

impl StorageError {
    /// Returns `true` for failures that must abort the unit of work.
    ///
    /// These are never downgraded to an empty or default result.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            StorageError::Id(_) | StorageError::Filter(_) | StorageError::Backend(_)
        )
    }

    /// Returns a message that is safe to show to end users.
    pub fn public_message(&self) -> String {
        match self {
            StorageError::Id(_) | StorageError::Filter(_) | StorageError::Backend(_) => {
                RETRY_LATER_MESSAGE.to_string()
            }
            StorageError::Tenant(_) => "access denied".to_string(),
            StorageError::Resource(err) => err.to_string(),
            StorageError::Validation(err) => err.to_string(),
        }
    }
}

/// Errors raised by the identifier allocator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The wall clock moved backwards since the last issued identifier.
    #[error("clock moved backwards by {}ms; refusing to issue identifiers", .last_ms - .now_ms)]
    ClockRegression { last_ms: u64, now_ms: u64 },

    /// The wall clock reads a time before the configured epoch.
    #[error("clock reads {now_ms}ms which precedes the identifier epoch {epoch_ms}ms")]
    BeforeEpoch { now_ms: u64, epoch_ms: u64 },

    /// The 41-bit timestamp field is exhausted.
    #[error("timestamp {elapsed_ms}ms since epoch no longer fits in 41 bits")]
    TimestampOverflow { elapsed_ms: u64 },

    /// A datacenter or worker id is out of range.
    #[error("{field} {value} is out of range (max {max})")]
    InvalidNodeId {
        field: &'static str,
        value: u8,
        max: u8,
    },
}

/// Errors related to tenant isolation.
#[derive(Error, Debug)]
pub enum TenantError {
    /// Access to a record denied for the current tenant.
    #[error("access denied: tenant {tenant_id} cannot access {kind}/{id}")]
    AccessDenied {
        tenant_id: TenantId,
        kind: String,
        id: i64,
    },

    /// Attempt to change the owning tenant of a persisted record.
    #[error("tenant of {kind}/{id} is immutable: stored {stored}, requested {requested}")]
    TenantImmutable {
        kind: String,
        id: i64,
        stored: TenantId,
        requested: TenantId,
    },

    /// Attempt to create a record in another tenant without privilege.
    #[error("tenant {caller} may not create {kind} records in tenant {target}")]
    CrossTenantWrite {
        caller: TenantId,
        target: TenantId,
        kind: String,
    },
}

/// Errors related to the session row filter.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The row filter could not be installed; the call is aborted.
    #[error("failed to activate tenant row filter for tenant {tenant_id}: {message}")]
    ActivationFailed {
        tenant_id: TenantId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The row filter could not be removed from the session.
    #[error("failed to deactivate tenant row filter: {message}")]
    DeactivationFailed { message: String },
}

/// Errors related to record state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found.
    #[error("record not found: {kind}/{id}")]
    NotFound { kind: String, id: i64 },

    /// A record with the given id already exists.
    #[error("record already exists: {kind}/{id}")]
    AlreadyExists { kind: String, id: i64 },
}

/// Errors related to input validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A predicate referenced a field the record type does not declare.
    #[error("unknown field '{field}' for record kind {kind}")]
    UnknownField { kind: String, field: String },

    /// A tenant-scoped record resolved to no tenant.
    #[error("tenant-scoped record {kind} requires a tenant")]
    MissingTenant { kind: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
