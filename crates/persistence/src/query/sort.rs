//! Sort specifications.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{FieldRef, MetaField, Record};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One `(field, direction)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Ascending on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses a sort parameter value (e.g., "-createdAt" for descending).
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(stripped) = s.strip_prefix('-') {
            Self::desc(stripped.trim())
        } else {
            Self::asc(s.strip_prefix('+').unwrap_or(s).trim())
        }
    }
}

/// An ordered list of sort directives.
///
/// An empty sort, or one naming any blank or unknown field, sorts by the
/// default order: `createdAt` descending. Malformed client input therefore
/// never fails a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Directives in priority order.
    pub directives: Vec<SortDirective>,
}

impl Sort {
    /// The empty sort (default order).
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// A sort with a single directive.
    pub fn by(directive: SortDirective) -> Self {
        Self {
            directives: vec![directive],
        }
    }

    /// Appends a directive.
    pub fn then(mut self, directive: SortDirective) -> Self {
        self.directives.push(directive);
        self
    }

    /// Parses a comma separated list such as `"-createdAt,title"`.
    pub fn parse(s: &str) -> Self {
        Self {
            directives: s
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(SortDirective::parse)
                .collect(),
        }
    }

    /// Returns `true` if no directive is given.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Resolves the directives against `R`'s fields.
    ///
    /// Falls back to [`ResolvedSort::default_order`] if the sort is empty or
    /// any field is unknown.
    pub fn resolve<R: Record>(&self) -> ResolvedSort {
        if self.directives.is_empty() {
            return ResolvedSort::default_order();
        }

        let mut keys = Vec::with_capacity(self.directives.len());
        for directive in &self.directives {
            match FieldRef::resolve::<R>(&directive.field) {
                Some(field) => keys.push((field, directive.direction)),
                None => {
                    debug!(
                        kind = R::KIND,
                        field = %directive.field,
                        "Unknown sort field, using default order"
                    );
                    return ResolvedSort::default_order();
                }
            }
        }
        ResolvedSort { keys }
    }
}

impl From<SortDirective> for Sort {
    fn from(directive: SortDirective) -> Self {
        Sort::by(directive)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .directives
            .iter()
            .map(|d| match d.direction {
                SortDirection::Ascending => d.field.clone(),
                SortDirection::Descending => format!("-{}", d.field),
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// A sort whose fields are known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSort {
    /// Sort keys in priority order.
    pub keys: Vec<(FieldRef, SortDirection)>,
}

impl ResolvedSort {
    /// `createdAt` descending.
    pub fn default_order() -> Self {
        Self {
            keys: vec![(
                FieldRef::Meta(MetaField::CreatedAt),
                SortDirection::Descending,
            )],
        }
    }

    /// Returns `true` if this is the default order.
    pub fn is_default(&self) -> bool {
        *self == Self::default_order()
    }

    /// Direction used to break ties on `id`.
    ///
    /// Follows the last key, so the default order lists newer records first
    /// even within one timestamp.
    pub fn tie_break(&self) -> Option<SortDirection> {
        if self.keys.iter().any(|(f, _)| *f == FieldRef::Meta(MetaField::Id)) {
            return None;
        }
        Some(
            self.keys
                .last()
                .map(|(_, direction)| *direction)
                .unwrap_or(SortDirection::Descending),
        )
    }
}
