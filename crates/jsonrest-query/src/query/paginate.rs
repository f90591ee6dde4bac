//! Pagination stage: offset, cursor and page-number strategies

use serde::Serialize;
use serde_json::Value;

use super::path::PropertyPath;
use super::{QueryError, Result, Staged};

/// Default page length for `offset` and `cursor` pagination
pub const DEFAULT_TOP: usize = 10;

/// Default page length for `paging` pagination
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Pagination strategy and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaginationSpec {
    /// Skip `skip` records, then take `top`
    Offset {
        /// Records to skip
        skip: usize,
        /// Page length
        top: usize,
    },
    /// Take `top` records after the record whose cursor is `after`
    Cursor {
        /// Cursor of the last record already seen
        after: Option<String>,
        /// Page length
        top: usize,
    },
    /// One-based page number over fixed-size pages
    Paging {
        /// Page to return, starting at 1
        page_number: usize,
        /// Page length
        page_size: usize,
    },
}

impl Default for PaginationSpec {
    fn default() -> Self {
        PaginationSpec::Offset {
            skip: 0,
            top: DEFAULT_TOP,
        }
    }
}

impl PaginationSpec {
    /// Strategy name as used by the `pagingtype` parameter
    pub fn kind(&self) -> &'static str {
        match self {
            PaginationSpec::Offset { .. } => "offset",
            PaginationSpec::Cursor { .. } => "cursor",
            PaginationSpec::Paging { .. } => "paging",
        }
    }

    /// Reject page lengths and page numbers that can never produce a page
    ///
    /// An offset `top` of zero is allowed and yields an empty page.
    pub fn validate(&self) -> Result<()> {
        match self {
            PaginationSpec::Offset { .. } => Ok(()),
            PaginationSpec::Cursor { top: 0, .. } => Err(QueryError::InvalidPaginationSpec(
                "top must be at least 1 for cursor pagination".into(),
            )),
            PaginationSpec::Cursor { .. } => Ok(()),
            PaginationSpec::Paging { page_size: 0, .. } => Err(
                QueryError::InvalidPaginationSpec("pagesize must be at least 1".into()),
            ),
            PaginationSpec::Paging { page_number: 0, .. } => Err(
                QueryError::InvalidPaginationSpec("pagenumber starts at 1".into()),
            ),
            PaginationSpec::Paging { .. } => Ok(()),
        }
    }
}

/// Summary fragment for the pagination stage: the applied parameters plus
/// what the strategy computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaginationSummary {
    /// Offset pagination
    Offset {
        /// Records skipped
        skip: usize,
        /// Page length
        top: usize,
        /// Records available before pagination
        total_count: usize,
    },
    /// Cursor pagination
    Cursor {
        /// Cursor the page started after
        after: Option<String>,
        /// Page length
        top: usize,
        /// Cursor of the last returned record
        last_cursor: Option<String>,
        /// Whether records remain after this page
        has_next_page: bool,
    },
    /// Page-number pagination
    Paging {
        /// Page returned
        page_number: usize,
        /// Page length
        page_size: usize,
        /// Page count as reported to clients
        total_page_count: usize,
    },
}

/// Extracts the cursor of a record for cursor pagination
pub trait CursorKey {
    /// Cursor of `record`, or `None` if it has none
    fn cursor_of(&self, record: &Value) -> Option<String>;
}

impl<F> CursorKey for F
where
    F: Fn(&Value) -> Option<String>,
{
    fn cursor_of(&self, record: &Value) -> Option<String> {
        self(record)
    }
}

/// Cursor key read from an id property
///
/// Strings are used verbatim; numbers and booleans use their JSON text.
/// Null, objects, arrays and missing values give no cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdProperty {
    path: PropertyPath,
}

impl IdProperty {
    /// Cursor key for the property at `path`
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            path: PropertyPath::parse(path)?,
        })
    }

    /// The id property path
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }
}

impl CursorKey for IdProperty {
    fn cursor_of(&self, record: &Value) -> Option<String> {
        match self.path.resolve(record)? {
            Value::String(s) => Some(s.clone()),
            value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
            _ => None,
        }
    }
}

/// Pagination stage
///
/// Runs the strategy named by `spec`, which is validated first, so a
/// page length of zero never reaches the slicing code unless it is an offset
/// `top`.
pub fn paginate_records(
    data: Vec<Value>,
    spec: &PaginationSpec,
    cursor: &dyn CursorKey,
) -> Result<Staged<PaginationSummary>> {
    spec.validate()?;

    let staged = match spec {
        PaginationSpec::Offset { skip, top } => {
            let total_count = data.len();
            let page = data.into_iter().skip(*skip).take(*top).collect();
            Staged::new(
                page,
                PaginationSummary::Offset {
                    skip: *skip,
                    top: *top,
                    total_count,
                },
            )
        }
        PaginationSpec::Cursor { after, top } => paginate_cursor(data, after.as_deref(), *top, cursor),
        PaginationSpec::Paging {
            page_number,
            page_size,
        } => {
            let total_page_count = total_page_count(data.len(), *page_size);
            let skip = page_size.saturating_mul(page_number - 1);
            let page = data.into_iter().skip(skip).take(*page_size).collect();
            Staged::new(
                page,
                PaginationSummary::Paging {
                    page_number: *page_number,
                    page_size: *page_size,
                    total_page_count,
                },
            )
        }
    };

    Ok(staged)
}

fn paginate_cursor(
    data: Vec<Value>,
    after: Option<&str>,
    top: usize,
    cursor: &dyn CursorKey,
) -> Staged<PaginationSummary> {
    let after = after.filter(|a| !a.is_empty());
    let summary = |last_cursor, has_next_page| PaginationSummary::Cursor {
        after: after.map(str::to_string),
        top,
        last_cursor,
        has_next_page,
    };

    if data.is_empty() {
        return Staged::new(data, summary(None, false));
    }

    // An `after` that matches nothing restarts from the first record.
    let start = after
        .and_then(|after| {
            data.iter()
                .position(|record| cursor.cursor_of(record).as_deref() == Some(after))
        })
        .map_or(0, |index| index + 1);

    let tail_cursor = data.last().and_then(|record| cursor.cursor_of(record));
    let page: Vec<Value> = data.into_iter().skip(start).take(top).collect();

    let (last_cursor, has_next_page) = match page.last() {
        Some(record) => {
            let last = cursor.cursor_of(record);
            let has_next = last != tail_cursor;
            (last, has_next)
        }
        None => (None, false),
    };

    Staged::new(page, summary(last_cursor, has_next_page))
}

/// Page count reported by `paging` pagination
///
/// An exact multiple reports one page fewer than it holds.
fn total_page_count(len: usize, page_size: usize) -> usize {
    if len == 0 {
        1
    } else if len % page_size == 0 {
        len / page_size - 1
    } else {
        len / page_size
    }
}
