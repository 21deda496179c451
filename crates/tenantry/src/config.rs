//! Command line configuration for the `tenantry` tool.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TENANTRY_DATABASE` | tenantry.db | Database file, or `:memory:` |
//! | `TENANTRY_LOG_LEVEL` | info | Log level |
//! | `TENANTRY_DATACENTER_ID` | 0 | Datacenter id of this process (0-31) |
//! | `TENANTRY_WORKER_ID` | 0 | Worker id of this process (0-31) |
//! | `TENANTRY_MAX_CONNECTIONS` | 10 | Connection pool size |

use clap::{Parser, Subcommand};
use tenantry_persistence::backends::sqlite::SqliteBackendConfig;
use tenantry_persistence::ids::{IdGeneratorConfig, MAX_DATACENTER_ID, MAX_WORKER_ID};
use tenantry_persistence::store::StoreConfig;

/// Largest batch `next-id` will issue in one run.
pub const MAX_ID_BATCH: u32 = 100_000;

/// Operator tool for the Tenantry record store.
#[derive(Debug, Clone, Parser)]
#[command(name = "tenantry")]
#[command(about = "Schema initialisation and identifier inspection for Tenantry")]
pub struct CliConfig {
    /// Database file path, or `:memory:`.
    #[arg(long, env = "TENANTRY_DATABASE", default_value = "tenantry.db", global = true)]
    pub database: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "TENANTRY_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Datacenter id of this process.
    #[arg(long, env = "TENANTRY_DATACENTER_ID", default_value = "0", global = true)]
    pub datacenter_id: u8,

    /// Worker id of this process.
    #[arg(long, env = "TENANTRY_WORKER_ID", default_value = "0", global = true)]
    pub worker_id: u8,

    /// Maximum number of pooled connections.
    #[arg(long, env = "TENANTRY_MAX_CONNECTIONS", default_value = "10", global = true)]
    pub max_connections: u32,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create or migrate the database schema.
    Init,

    /// Issue identifiers from this node's generator.
    NextId {
        /// Number of identifiers to issue.
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Split an identifier into timestamp, node and sequence.
    DecodeId {
        /// The identifier.
        id: i64,
    },
}

impl CliConfig {
    /// Validates the configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if self.datacenter_id > MAX_DATACENTER_ID {
            errors.push(format!(
                "Datacenter id must be at most {}, got {}",
                MAX_DATACENTER_ID, self.datacenter_id
            ));
        }

        if self.worker_id > MAX_WORKER_ID {
            errors.push(format!(
                "Worker id must be at most {}, got {}",
                MAX_WORKER_ID, self.worker_id
            ));
        }

        if self.max_connections == 0 {
            errors.push("Max connections cannot be 0".to_string());
        }

        match &self.command {
            Command::NextId { count } if *count == 0 || *count > MAX_ID_BATCH => {
                errors.push(format!("Count must be between 1 and {}", MAX_ID_BATCH));
            }
            Command::DecodeId { id } if *id < 0 => {
                errors.push("Identifiers are never negative".to_string());
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns the identifier generator settings.
    pub fn id_config(&self) -> IdGeneratorConfig {
        IdGeneratorConfig::new(self.datacenter_id, self.worker_id)
    }

    /// Returns the store settings.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            database: self.database.clone(),
            sqlite: SqliteBackendConfig {
                max_connections: self.max_connections,
                ..Default::default()
            },
            ids: self.id_config(),
            ..Default::default()
        }
    }
}
