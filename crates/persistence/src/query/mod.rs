//! Predicates, sorting, pagination and the query engine.
//!
//! # Predicates
//!
//! [`Predicate`] is an expression tree over record fields. It composes with
//! [`Predicate::and`], [`Predicate::or`] and [`Predicate::not`] and is lowered
//! to SQL by the storage backend.
//!
//! # Sorting
//!
//! [`Sort`] is an ordered list of `(field, direction)` pairs. A sort naming a
//! blank or unknown field is not an error: the whole sort falls back to the
//! default order, `createdAt` descending.
//!
//! ```
//! use tenantry_persistence::query::{PageRequest, Predicate, Sort, SortDirection};
//!
//! let predicate = Predicate::contains("title", "invoice").and(Predicate::ge("amount", 100));
//! let sort = Sort::parse("-createdAt,title");
//! assert_eq!(sort.directives[0].direction, SortDirection::Descending);
//!
//! let request = PageRequest::new(2, 50);
//! assert_eq!(request.offset(), 50);
//! ```

mod engine;
mod page;
mod predicate;
mod sort;

pub use engine::{QueryEngine, Scoping};
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, PagingConfig};
pub use predicate::{CmpOp, FieldValue, Predicate};
pub use sort::{ResolvedSort, Sort, SortDirection, SortDirective};
