//! Pipeline orchestration: filter, sort, select, paginate

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, debug_span};

use super::ast::Filter;
use super::filter::{filter_records, FilterSummary};
use super::paginate::{paginate_records, CursorKey, PaginationSpec, PaginationSummary};
use super::path::PropertyPath;
use super::select::select_records;
use super::sort::{sort_records, SortKey};
use super::Result;

/// Options for one query, one entry per stage
///
/// `None` for filter, orderby or select skips that stage's work. Pagination
/// always runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Records must satisfy this filter
    pub filter: Option<Filter>,
    /// Sort keys, most significant first
    pub orderby: Option<Vec<SortKey>>,
    /// Paths to project each record onto
    pub select: Option<Vec<PropertyPath>>,
    /// Pagination strategy
    pub pagination: PaginationSpec,
}

/// What each stage applied and computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    /// Filter stage
    pub filtering: FilterSummary,
    /// Sort stage, `null` when unsorted
    pub sorting: Option<Vec<SortKey>>,
    /// Select stage, `null` when unprojected
    pub selecting: Option<Vec<PropertyPath>>,
    /// Pagination stage
    pub pagination: PaginationSummary,
}

/// Records returned by a query, with its summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Final page of records
    pub data: Vec<Value>,
    /// What was applied
    pub summary: QuerySummary,
}

/// Run the four stages over `collection`
///
/// `cursor` is only consulted for cursor pagination. Any stage error fails
/// the whole query.
pub fn execute(
    collection: Vec<Value>,
    options: &QueryOptions,
    cursor: &dyn CursorKey,
) -> Result<QueryResult> {
    let span = debug_span!("query", records = collection.len());
    let _enter = span.enter();

    let filtered = filter_records(collection, options.filter.as_ref())?;
    debug!(remaining = filtered.data.len(), "filter applied");

    let sorted = sort_records(filtered.data, options.orderby.as_deref());
    debug!(keys = sorted.summary.as_ref().map_or(0, Vec::len), "sort applied");

    let selected = select_records(sorted.data, options.select.as_deref());
    debug!(paths = selected.summary.as_ref().map_or(0, Vec::len), "select applied");

    let paginated = paginate_records(selected.data, &options.pagination, cursor)?;
    debug!(
        strategy = options.pagination.kind(),
        returned = paginated.data.len(),
        "pagination applied"
    );

    Ok(QueryResult {
        data: paginated.data,
        summary: QuerySummary {
            filtering: filtered.summary,
            sorting: sorted.summary,
            selecting: selected.summary,
            pagination: paginated.summary,
        },
    })
}
