//! Tenantry operator tool
//!
//! Initialises the record store schema and issues or inspects record
//! identifiers for a configured node.

mod config;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat};
use clap::Parser;
use tenantry_persistence::ids::{IdGenerator, IdParts};
use tenantry_persistence::store::RecordStore;
use tracing::info;

use config::{CliConfig, Command};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tenantry={level},tenantry_persistence={level}",
            level = level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    match config.command {
        Command::Init => init(&config),
        Command::NextId { count } => next_id(&config, count),
        Command::DecodeId { id } => decode_id(&config, id),
    }
}

/// Opens the database, creating or migrating its schema.
fn init(config: &CliConfig) -> anyhow::Result<()> {
    info!(database = %config.database, "Initializing record store");
    let store = RecordStore::open(config.store_config())
        .with_context(|| format!("failed to open {}", config.database))?;
    store.backend().health_check()?;
    let version = store.backend().schema_version()?;
    println!("{}: schema version {}", config.database, version);
    Ok(())
}

fn next_id(config: &CliConfig, count: u32) -> anyhow::Result<()> {
    let ids = IdGenerator::new(config.id_config()).context("invalid generator configuration")?;
    for _ in 0..count {
        println!("{}", ids.next()?);
    }
    info!(
        count,
        datacenter_id = config.datacenter_id,
        worker_id = config.worker_id,
        "Issued identifiers"
    );
    Ok(())
}

fn decode_id(config: &CliConfig, id: i64) -> anyhow::Result<()> {
    let parts = IdParts::decode(id, config.id_config().epoch_ms);
    let millis = i64::try_from(parts.timestamp_ms).context("timestamp out of range")?;
    let timestamp = DateTime::from_timestamp_millis(millis)
        .context("timestamp out of range")?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    println!("id:            {}", id);
    println!("timestamp:     {}", timestamp);
    println!("datacenter_id: {}", parts.datacenter_id);
    println!("worker_id:     {}", parts.worker_id);
    println!("sequence:      {}", parts.sequence);
    Ok(())
}
