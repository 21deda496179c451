//! Storage sessions and the tenant row filter.
//!
//! A [`SqliteSession`] owns one pooled connection for the duration of a
//! repository call. While its row filter is enabled, every statement the
//! session issues against a tenant-scoped kind carries an implicit
//! `tenant_id = (SELECT tenant_id FROM temp.row_filter)` term. The filter
//! tenant lives in a connection-local temporary table, so it is invisible to
//! other connections and cannot leak into concurrent sessions.

use std::fmt::Debug;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::error::{BackendError, ResourceError, StorageResult, TenantError};
use crate::tenant::TenantId;

use super::query_builder::{SqlFragment, SqlParam};

const ROW_FILTER_CLAUSE: &str = "tenant_id = (SELECT tenant_id FROM temp.row_filter)";

const RECORD_COLUMNS: &str =
    "id, tenant_id, created_at, updated_at, created_by, updated_by, data";

/// The tenant predicate installed on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    tenant_id: TenantId,
}

impl RowFilter {
    /// Returns the filtered tenant.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// The table a statement runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTable<'a> {
    /// Record kind.
    pub kind: &'a str,
    /// Whether rows of this kind belong to tenants.
    pub tenant_scoped: bool,
}

/// A stored row, as read from or written to the `records` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    /// Record id.
    pub id: i64,
    /// Owning tenant, for tenant-scoped kinds.
    pub tenant_id: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 modification time.
    pub updated_at: String,
    /// Creating user.
    pub created_by: Option<String>,
    /// Last modifying user.
    pub updated_by: Option<String>,
    /// JSON document of business fields.
    pub data: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            created_by: row.get(4)?,
            updated_by: row.get(5)?,
            data: row.get(6)?,
        })
    }
}

/// Bounds of a page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Maximum number of rows.
    pub limit: u64,
    /// Rows skipped before the first returned row.
    pub offset: u64,
}

/// One pooled connection plus its row filter state.
pub struct SqliteSession {
    conn: PooledConnection<SqliteConnectionManager>,
    row_filter: Option<RowFilter>,
}

impl Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("row_filter", &self.row_filter)
            .finish_non_exhaustive()
    }
}

impl SqliteSession {
    pub(crate) fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self {
            conn,
            row_filter: None,
        }
    }

    /// Returns the active row filter, if any.
    pub fn row_filter(&self) -> Option<&RowFilter> {
        self.row_filter.as_ref()
    }

    /// Installs the row filter for `tenant_id`.
    pub fn enable_row_filter(&mut self, tenant_id: &TenantId) -> Result<(), BackendError> {
        self.conn
            .execute_batch(
                "CREATE TEMP TABLE IF NOT EXISTS row_filter (tenant_id TEXT NOT NULL);
                 DELETE FROM temp.row_filter;",
            )
            .and_then(|_| {
                self.conn.execute(
                    "INSERT INTO temp.row_filter (tenant_id) VALUES (?1)",
                    [tenant_id.as_str()],
                )
            })
            .map_err(|e| BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: format!("Failed to install row filter: {}", e),
                source: Some(Box::new(e)),
            })?;

        debug!(tenant = %tenant_id, "Row filter enabled");
        self.row_filter = Some(RowFilter {
            tenant_id: tenant_id.clone(),
        });
        Ok(())
    }

    /// Removes the row filter.
    ///
    /// The session is unfiltered afterwards even if clearing the filter table
    /// fails; the connection is returned to the pool with an empty filter at
    /// worst, which matches nothing.
    pub fn disable_row_filter(&mut self) -> Result<(), BackendError> {
        let Some(filter) = self.row_filter.take() else {
            return Ok(());
        };
        self.conn
            .execute("DELETE FROM temp.row_filter", [])
            .map_err(|e| BackendError::Internal {
                backend_name: "sqlite".to_string(),
                message: format!("Failed to clear row filter: {}", e),
                source: Some(Box::new(e)),
            })?;
        debug!(tenant = %filter.tenant_id, "Row filter disabled");
        Ok(())
    }

    /// Runs `work` in a transaction, committing on `Ok`.
    pub fn transaction<T>(&self, work: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = work()?;
        tx.commit()?;
        Ok(out)
    }

    /// Selects rows matching `filter`, ordered and windowed.
    pub fn select(
        &self,
        table: RecordTable<'_>,
        filter: &SqlFragment,
        order_by: &str,
        window: Option<Window>,
    ) -> StorageResult<Vec<RecordRow>> {
        let mut sql = format!(
            "SELECT {} FROM records WHERE {}",
            RECORD_COLUMNS,
            self.where_clause(table, filter)
        );
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(window) = window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind(table, filter)), RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Counts rows matching `filter`.
    pub fn count(&self, table: RecordTable<'_>, filter: &SqlFragment) -> StorageResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM records WHERE {}",
            self.where_clause(table, filter)
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind(table, filter)), |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    /// Returns `true` if any row matches `filter`.
    pub fn exists(&self, table: RecordTable<'_>, filter: &SqlFragment) -> StorageResult<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM records WHERE {})",
            self.where_clause(table, filter)
        );
        let exists: bool = self
            .conn
            .query_row(&sql, params_from_iter(bind(table, filter)), |row| {
                row.get(0)
            })?;
        Ok(exists)
    }

    /// Reads the row with `id`, whatever its tenant.
    ///
    /// Used to tell "not found" from "not visible" on writes; the row filter
    /// does not apply.
    pub fn find_any(&self, kind: &str, id: i64) -> StorageResult<Option<RecordRow>> {
        let sql = format!(
            "SELECT {} FROM records WHERE kind = ?1 AND id = ?2",
            RECORD_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![kind, id], RecordRow::from_row)
            .optional()?;
        Ok(row)
    }

    /// Inserts a new row.
    ///
    /// A filtered session only inserts rows of its own tenant.
    pub fn insert(&self, table: RecordTable<'_>, row: &RecordRow) -> StorageResult<()> {
        if table.tenant_scoped {
            if let Some(filter) = &self.row_filter {
                if row.tenant_id.as_deref() != Some(filter.tenant_id.as_str()) {
                    return Err(TenantError::CrossTenantWrite {
                        caller: filter.tenant_id.clone(),
                        target: TenantId::new(row.tenant_id.clone().unwrap_or_default()),
                        kind: table.kind.to_string(),
                    }
                    .into());
                }
            }
        }

        let result = self.conn.execute(
            "INSERT INTO records (kind, id, tenant_id, created_at, updated_at, created_by, updated_by, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                table.kind,
                row.id,
                row.tenant_id,
                row.created_at,
                row.updated_at,
                row.created_by,
                row.updated_by,
                row.data,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(ResourceError::AlreadyExists {
                    kind: table.kind.to_string(),
                    id: row.id,
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites the mutable columns of the visible row matched by `target`.
    ///
    /// `id`, `tenant_id`, `created_at` and `created_by` are never written.
    /// Returns `false` if no visible row matched.
    pub fn update(
        &self,
        table: RecordTable<'_>,
        row: &RecordRow,
        target: &SqlFragment,
    ) -> StorageResult<bool> {
        let sql = format!(
            "UPDATE records SET updated_at = ?, updated_by = ?, data = ? WHERE {}",
            self.where_clause(table, target)
        );
        let mut values: Vec<SqlParam> = vec![
            row.updated_at.clone().into(),
            row.updated_by.clone().into(),
            row.data.clone().into(),
        ];
        values.extend(bind(table, target));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(changed > 0)
    }

    /// Deletes the visible rows matched by `target`, returning how many.
    pub fn delete(&self, table: RecordTable<'_>, target: &SqlFragment) -> StorageResult<u64> {
        let sql = format!(
            "DELETE FROM records WHERE {}",
            self.where_clause(table, target)
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind(table, target)))?;
        Ok(changed as u64)
    }

    fn where_clause(&self, table: RecordTable<'_>, filter: &SqlFragment) -> String {
        let mut clause = String::from("kind = ?");
        if table.tenant_scoped && self.row_filter.is_some() {
            clause.push_str(" AND ");
            clause.push_str(ROW_FILTER_CLAUSE);
        }
        if !filter.is_empty() {
            clause.push_str(&format!(" AND ({})", filter.sql));
        }
        clause
    }
}

fn bind(table: RecordTable<'_>, filter: &SqlFragment) -> Vec<SqlParam> {
    let mut values = Vec::with_capacity(filter.params.len() + 1);
    values.push(SqlParam::string(table.kind));
    values.extend(filter.params.iter().cloned());
    values
}
