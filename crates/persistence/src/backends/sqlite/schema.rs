//! SQLite schema definitions.

use rusqlite::Connection;

use crate::error::{BackendError, StorageResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::info!(version = SCHEMA_VERSION, "Initialized record store schema");
    } else if current_version > SCHEMA_VERSION {
        return Err(BackendError::MigrationError {
            message: format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            ),
        }
        .into());
    }

    Ok(())
}

/// Get the current schema version.
pub fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("set schema_version", e))?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            kind TEXT NOT NULL,
            id INTEGER NOT NULL,
            tenant_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT,
            updated_by TEXT,
            data TEXT NOT NULL,
            PRIMARY KEY (kind, id)
        );

        CREATE INDEX IF NOT EXISTS idx_records_tenant
            ON records(kind, tenant_id, created_at);

        CREATE TRIGGER IF NOT EXISTS records_tenant_immutable
        BEFORE UPDATE OF tenant_id ON records
        WHEN OLD.tenant_id IS NOT NEW.tenant_id
        BEGIN
            SELECT RAISE(ABORT, 'tenant_id is immutable');
        END;
        ",
    )
    .map_err(|e| migration_error("create records table", e))?;
    Ok(())
}

/// Drop all tables (for testing).
#[cfg(test)]
fn drop_all_tables(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        DROP TRIGGER IF EXISTS records_tenant_immutable;
        DROP TABLE IF EXISTS records;
        DROP TABLE IF EXISTS schema_version;
        ",
    )
    .map_err(|e| migration_error("drop tables", e))?;
    Ok(())
}

fn migration_error(step: &str, err: rusqlite::Error) -> crate::error::StorageError {
    BackendError::MigrationError {
        message: format!("failed to {}: {}", step, err),
    }
    .into()
}
