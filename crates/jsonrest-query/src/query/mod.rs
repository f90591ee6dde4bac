//! Query engine - OData-style filter/sort/select/paginate over a JSON array
//!
//! A collection is a plain `Vec<serde_json::Value>`. A query is a
//! [`QueryOptions`] bundle, usually bound from URL parameters, and runs as a
//! fixed four-stage pipeline. Every stage consumes the previous stage's array
//! and reports what it did:
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//! │  filter  │ → │   sort   │ → │  select  │ → │  paginate  │
//! └──────────┘   └──────────┘   └──────────┘   └────────────┘
//!      │              │              │                │
//!      └──────────────┴──── QuerySummary ─────────────┘
//! ```
//!
//! Filters are parsed once into a [`Filter`] tree, compiled once into a
//! predicate closure, then applied to every record. Nothing is indexed and
//! nothing is cached between calls.
//!
//! # Example
//!
//! ```rust
//! use jsonrest_query::query::{execute, IdProperty, ParamDefaults, QueryOptions};
//! use serde_json::json;
//!
//! let people = vec![
//!     json!({ "id": "1", "name": "John", "age": 31 }),
//!     json!({ "id": "2", "name": "Amy", "age": 27 }),
//! ];
//!
//! let options = QueryOptions::from_query_string(
//!     "filter=startswith(name, 'Jo')&select=id,name",
//!     &ParamDefaults::default(),
//! )
//! .unwrap();
//! let cursor = IdProperty::new("id").unwrap();
//!
//! let result = execute(people, &options, &cursor).unwrap();
//! assert_eq!(result.data, vec![json!({ "id": "1", "name": "John" })]);
//! ```

pub mod ast;
pub mod filter;
pub mod operand;
pub mod paginate;
pub mod params;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod select;
pub mod sort;
mod value;

pub use ast::{ComparisonOp, Filter, Function, Operand, StringPredicate};
pub use filter::{compile, filter_records, FilterSummary, Predicate};
pub use operand::evaluate_operand;
pub use paginate::{paginate_records, CursorKey, IdProperty, PaginationSpec, PaginationSummary};
pub use params::ParamDefaults;
pub use parser::{parse_filter, parse_orderby, parse_select};
pub use path::{pick, resolve, PropertyPath};
pub use pipeline::{execute, QueryOptions, QueryResult, QuerySummary};
pub use select::select_records;
pub use sort::{sort_records, SortDirection, SortKey};

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing or running a query
///
/// Every variant is caused by the request itself, never by the stored data
/// or the process, so callers report all of them as client errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A filter, orderby or select expression could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// An operand evaluated to a type the function or comparison cannot use
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The expression names an operator or function that is not implemented
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Pagination parameters are missing, malformed or out of range
    #[error("Invalid pagination: {0}")]
    InvalidPaginationSpec(String),
}

impl QueryError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Parse(_) => "parse_error",
            QueryError::TypeMismatch(_) => "type_mismatch",
            QueryError::UnsupportedOperator(_) => "unsupported_operator",
            QueryError::InvalidPaginationSpec(_) => "invalid_pagination",
        }
    }
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Output of one pipeline stage: the records it produced and what it applied
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<S> {
    /// Records handed to the next stage
    pub data: Vec<Value>,
    /// Stage summary fragment
    pub summary: S,
}

impl<S> Staged<S> {
    fn new(data: Vec<Value>, summary: S) -> Self {
        Self { data, summary }
    }
}
