//! Lowers predicates and sorts to SQLite SQL.
//!
//! Metadata fields map to columns of the `records` table; business fields
//! are read from the JSON document with `json_extract`. Placeholders are
//! anonymous (`?`), so a fragment's parameters are bound in textual order and
//! fragments compose by concatenation.
//!
//! Substring matches compare through [`FOLD_CASE_FN`], a Unicode-aware scalar
//! function every pooled connection registers. SQLite's own `LOWER()` only
//! folds ASCII.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value};

use crate::error::ValidationError;
use crate::query::{CmpOp, FieldValue, Predicate, ResolvedSort};
use crate::record::{FieldRef, Record};

/// Name of the case-folding SQL function used by `contains`.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Folds `s` for case-insensitive comparison.
///
/// The needle and the stored value both go through this, the latter inside
/// SQL as [`FOLD_CASE_FN`].
pub fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
            SqlParam::Float(f) => ToSqlOutput::from(*f),
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl From<i64> for SqlParam {
    fn from(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::String(s)
    }
}

impl From<Option<String>> for SqlParam {
    fn from(s: Option<String>) -> Self {
        s.map_or(SqlParam::Null, SqlParam::String)
    }
}

impl From<&FieldValue> for SqlParam {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => SqlParam::Null,
            FieldValue::Bool(b) => SqlParam::Integer(*b as i64),
            FieldValue::Integer(i) => SqlParam::Integer(*i),
            FieldValue::Float(f) => SqlParam::Float(*f),
            FieldValue::Timestamp(ts) => SqlParam::String(format_timestamp(ts)),
            FieldValue::Text(s) => SqlParam::String(s.clone()),
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Combines with another fragment using AND.
    pub fn and(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) AND ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Formats a timestamp the way it is stored: RFC 3339, microseconds, `Z`.
///
/// The fixed width keeps lexical and chronological order identical.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQL expression reading a field of `R`.
pub fn field_expr(field: FieldRef) -> String {
    match field {
        FieldRef::Meta(meta) => meta.column().to_string(),
        FieldRef::Data(name) => format!("json_extract(data, '$.{}')", name),
    }
}

/// Lowers a predicate to a WHERE-clause fragment for `R`.
///
/// Fails if the predicate names a field `R` does not declare.
pub fn lower_predicate<R: Record>(predicate: &Predicate) -> Result<SqlFragment, ValidationError> {
    match predicate {
        Predicate::True => Ok(SqlFragment::new("1 = 1")),
        Predicate::False => Ok(SqlFragment::new("1 = 0")),
        Predicate::And(parts) => join::<R>(parts, " AND ", "1 = 1"),
        Predicate::Or(parts) => join::<R>(parts, " OR ", "1 = 0"),
        Predicate::Not(inner) => {
            let inner = lower_predicate::<R>(inner)?;
            Ok(SqlFragment::with_params(
                format!("NOT ({})", inner.sql),
                inner.params,
            ))
        }
        Predicate::Eq(field, FieldValue::Null) | Predicate::IsNull(field) => Ok(SqlFragment::new(
            format!("{} IS NULL", resolve::<R>(field)?),
        )),
        Predicate::Eq(field, value) => Ok(SqlFragment::with_params(
            format!("{} = ?", resolve::<R>(field)?),
            vec![value.into()],
        )),
        Predicate::Contains(field, needle) => Ok(SqlFragment::with_params(
            format!(
                "{}({}) LIKE ? ESCAPE '\\'",
                FOLD_CASE_FN,
                resolve::<R>(field)?
            ),
            vec![SqlParam::String(format!(
                "%{}%",
                escape_like(&fold_case(needle))
            ))],
        )),
        Predicate::In(field, values) => {
            let expr = resolve::<R>(field)?;
            if values.is_empty() {
                return Ok(SqlFragment::new("1 = 0"));
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            Ok(SqlFragment::with_params(
                format!("{} IN ({})", expr, placeholders),
                values.iter().map(SqlParam::from).collect(),
            ))
        }
        Predicate::Cmp(field, op, value) => {
            let op = match op {
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
                CmpOp::Ne => "IS NOT",
            };
            Ok(SqlFragment::with_params(
                format!("{} {} ?", resolve::<R>(field)?, op),
                vec![value.into()],
            ))
        }
    }
}

/// Lowers a resolved sort to an ORDER BY list (without the keywords).
pub fn lower_sort(sort: &ResolvedSort) -> String {
    let mut terms: Vec<String> = sort
        .keys
        .iter()
        .map(|(field, direction)| format!("{} {}", field_expr(*field), direction.as_sql()))
        .collect();
    if let Some(direction) = sort.tie_break() {
        terms.push(format!("id {}", direction.as_sql()));
    }
    terms.join(", ")
}

fn join<R: Record>(
    parts: &[Predicate],
    separator: &str,
    empty: &str,
) -> Result<SqlFragment, ValidationError> {
    if parts.is_empty() {
        return Ok(SqlFragment::new(empty));
    }
    let mut sql = Vec::with_capacity(parts.len());
    let mut params = Vec::new();
    for part in parts {
        let fragment = lower_predicate::<R>(part)?;
        sql.push(format!("({})", fragment.sql));
        params.extend(fragment.params);
    }
    Ok(SqlFragment::with_params(sql.join(separator), params))
}

fn resolve<R: Record>(field: &str) -> Result<String, ValidationError> {
    FieldRef::resolve::<R>(field)
        .map(field_expr)
        .ok_or_else(|| ValidationError::UnknownField {
            kind: R::KIND.to_string(),
            field: field.to_string(),
        })
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Sort;
    use crate::record::{RecordMeta, RecordScope};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Ticket {
        #[serde(skip)]
        meta: RecordMeta,
        title: String,
        priority: i64,
    }

    impl Record for Ticket {
        const KIND: &'static str = "ticket";
        const SCOPE: RecordScope = RecordScope::Tenant;
        const FIELDS: &'static [&'static str] = &["title", "priority"];

        fn meta(&self) -> &RecordMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    }

    #[test]
    fn test_lower_equality() {
        let fragment = lower_predicate::<Ticket>(&Predicate::eq("title", "a")).unwrap();
        assert_eq!(fragment.sql, "json_extract(data, '$.title') = ?");
        assert_eq!(fragment.params, vec![SqlParam::string("a")]);

        let fragment = lower_predicate::<Ticket>(&Predicate::eq("tenantId", "acme")).unwrap();
        assert_eq!(fragment.sql, "tenant_id = ?");
    }

    #[test]
    fn test_lower_null_equality() {
        let fragment =
            lower_predicate::<Ticket>(&Predicate::eq("createdBy", FieldValue::Null)).unwrap();
        assert_eq!(fragment.sql, "created_by IS NULL");
        assert!(fragment.params.is_empty());
    }

    #[test]
    fn test_lower_contains_escapes_wildcards() {
        let fragment = lower_predicate::<Ticket>(&Predicate::contains("title", "50%_Off")).unwrap();
        assert_eq!(
            fragment.sql,
            "fold_case(json_extract(data, '$.title')) LIKE ? ESCAPE '\\'"
        );
        assert_eq!(fragment.params, vec![SqlParam::string("%50\\%\\_off%")]);
    }

    #[test]
    fn test_fold_case_handles_non_ascii() {
        assert_eq!(fold_case("ÄRGER Straße"), "ärger straße");
        assert_eq!(fold_case("ΣΟΦΙΑ"), "σοφια");
        let fragment = lower_predicate::<Ticket>(&Predicate::contains("title", "ÄRGER")).unwrap();
        assert_eq!(fragment.params, vec![SqlParam::string("%ärger%")]);
    }

    #[test]
    fn test_lower_composites_keep_parameter_order() {
        let predicate = Predicate::eq("title", "a")
            .or(Predicate::in_list("priority", [1, 2]))
            .and(Predicate::gt("id", 7i64).not());
        let fragment = lower_predicate::<Ticket>(&predicate).unwrap();
        assert_eq!(
            fragment.sql,
            "((json_extract(data, '$.title') = ?) OR (json_extract(data, '$.priority') IN (?, ?))) AND (NOT (id > ?))"
        );
        assert_eq!(
            fragment.params,
            vec![
                SqlParam::string("a"),
                SqlParam::integer(1),
                SqlParam::integer(2),
                SqlParam::integer(7),
            ]
        );
    }

    #[test]
    fn test_lower_empty_sets() {
        assert_eq!(
            lower_predicate::<Ticket>(&Predicate::In("title".into(), vec![]))
                .unwrap()
                .sql,
            "1 = 0"
        );
        assert_eq!(
            lower_predicate::<Ticket>(&Predicate::And(vec![])).unwrap().sql,
            "1 = 1"
        );
        assert_eq!(
            lower_predicate::<Ticket>(&Predicate::Or(vec![])).unwrap().sql,
            "1 = 0"
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = lower_predicate::<Ticket>(&Predicate::eq("owner", "x")).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn test_lower_sort() {
        assert_eq!(
            lower_sort(&Sort::unsorted().resolve::<Ticket>()),
            "created_at DESC, id DESC"
        );
        assert_eq!(
            lower_sort(&Sort::parse("priority,-title").resolve::<Ticket>()),
            "json_extract(data, '$.priority') ASC, json_extract(data, '$.title') DESC, id DESC"
        );
        assert_eq!(lower_sort(&Sort::parse("id").resolve::<Ticket>()), "id ASC");
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&ts), "2024-01-02T03:04:05.000000Z");
    }
}
