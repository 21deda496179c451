//! Predicate expressions over record fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tenant::TenantId;

/// A value compared against a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// SQL/JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer (ids are integers).
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Timestamp, compared at stored (microsecond) precision.
    Timestamp(DateTime<Utc>),
    /// Text.
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&TenantId> for FieldValue {
    fn from(v: &TenantId) -> Self {
        FieldValue::Text(v.as_str().to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordering comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Not equal; null-safe, so a missing value differs from any given value.
    Ne,
}

/// A boolean expression over record fields.
///
/// Field names are the metadata names (`id`, `tenantId`, `createdAt`,
/// `updatedAt`, `createdBy`, `updatedBy`) or a business field listed in
/// [`Record::FIELDS`](crate::record::Record::FIELDS).
///
/// ```
/// use tenantry_persistence::query::Predicate;
///
/// let open_reports = Predicate::eq("status", "open")
///     .and(Predicate::contains("title", "report"))
///     .and(Predicate::in_list("priority", [1, 2]).not());
/// assert!(matches!(open_reports, Predicate::And(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every record.
    True,
    /// Matches no record.
    False,
    /// All sub-predicates hold; empty is `True`.
    And(Vec<Predicate>),
    /// Any sub-predicate holds; empty is `False`.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// Field equals value; `Null` tests for absence.
    Eq(String, FieldValue),
    /// Case-insensitive substring match.
    Contains(String, String),
    /// Field is one of the values; an empty list matches nothing.
    In(String, Vec<FieldValue>),
    /// Ordering comparison.
    Cmp(String, CmpOp, FieldValue),
    /// Field is null or absent.
    IsNull(String),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::True
    }
}

impl Predicate {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Ne, value.into())
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Lt, value.into())
    }

    /// `field <= value`
    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Le, value.into())
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Gt, value.into())
    }

    /// `field >= value`
    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::Cmp(field.into(), CmpOp::Ge, value.into())
    }

    /// Case-insensitive substring match.
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains(field.into(), needle.into())
    }

    /// Set membership.
    pub fn in_list<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Field is null or absent.
    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull(field.into())
    }

    /// Conjunction, flattening nested `And`s.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Disjunction, flattening nested `Or`s.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::False, p) | (p, Predicate::False) => p,
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (p, Predicate::Or(mut right)) => {
                right.insert(0, p);
                Predicate::Or(right)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }

    /// Visits every field name referenced by this predicate.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_fields(out);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(out),
            Predicate::Eq(field, _)
            | Predicate::Contains(field, _)
            | Predicate::In(field, _)
            | Predicate::Cmp(field, _, _)
            | Predicate::IsNull(field) => out.push(field),
        }
    }
}
