//! Binding URL query parameters to [`QueryOptions`]
//!
//! Recognized parameters: `filter`, `orderby`, `select`, `pagingtype`,
//! `skip`, `top`, `after`, `pagenumber` and `pagesize`. Each may also be
//! written with the OData `$` prefix. Anything else is ignored.

use tracing::trace;

use super::paginate::{PaginationSpec, DEFAULT_PAGE_SIZE, DEFAULT_TOP};
use super::parser::{parse_filter, parse_orderby, parse_select};
use super::pipeline::QueryOptions;
use super::{QueryError, Result};

/// Page lengths used when the request does not give one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDefaults {
    /// `top` for offset and cursor pagination
    pub top: usize,
    /// `pagesize` for page-number pagination
    pub page_size: usize,
}

impl Default for ParamDefaults {
    fn default() -> Self {
        Self {
            top: DEFAULT_TOP,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default)]
struct RawParams {
    filter: Option<String>,
    orderby: Option<String>,
    select: Option<String>,
    pagingtype: Option<String>,
    skip: Option<String>,
    top: Option<String>,
    after: Option<String>,
    pagenumber: Option<String>,
    pagesize: Option<String>,
}

impl RawParams {
    fn set(&mut self, name: &str, value: String) {
        let slot = match name.strip_prefix('$').unwrap_or(name) {
            "filter" => &mut self.filter,
            "orderby" => &mut self.orderby,
            "select" => &mut self.select,
            "pagingtype" => &mut self.pagingtype,
            "skip" => &mut self.skip,
            "top" => &mut self.top,
            "after" => &mut self.after,
            "pagenumber" => &mut self.pagenumber,
            "pagesize" => &mut self.pagesize,
            other => {
                trace!(param = other, "ignoring query parameter");
                return;
            }
        };
        // later occurrences win, blank ones count as absent
        *slot = Some(value).filter(|v| !v.trim().is_empty());
    }
}

impl QueryOptions {
    /// Bind options from a URL query string, with or without the leading `?`
    ///
    /// ```rust
    /// use jsonrest_query::query::{PaginationSpec, ParamDefaults, QueryOptions};
    ///
    /// let options = QueryOptions::from_query_string(
    ///     "?$orderby=name%20desc&pagingtype=paging&pagenumber=2",
    ///     &ParamDefaults::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(
    ///     options.pagination,
    ///     PaginationSpec::Paging { page_number: 2, page_size: 10 }
    /// );
    /// ```
    pub fn from_query_string(query: &str, defaults: &ParamDefaults) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| QueryError::Parse(format!("malformed query string: {}", e)))?;
        Self::from_pairs(pairs, defaults)
    }

    /// Bind options from already-decoded name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I, defaults: &ParamDefaults) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawParams::default();
        for (name, value) in pairs {
            raw.set(name.as_ref(), value.into());
        }

        let filter = raw.filter.as_deref().map(parse_filter).transpose()?;
        let orderby = raw
            .orderby
            .as_deref()
            .map(parse_orderby)
            .transpose()?
            .filter(|keys| !keys.is_empty());
        let select = raw.select.as_deref().map(parse_select).transpose()?.flatten();
        let pagination = bind_pagination(&raw, defaults)?;

        Ok(QueryOptions {
            filter,
            orderby,
            select,
            pagination,
        })
    }
}

fn bind_pagination(raw: &RawParams, defaults: &ParamDefaults) -> Result<PaginationSpec> {
    let spec = match raw.pagingtype.as_deref().map(str::trim) {
        None | Some("offset") => PaginationSpec::Offset {
            skip: count("skip", raw.skip.as_deref(), 0)?,
            top: count("top", raw.top.as_deref(), defaults.top)?,
        },
        Some("cursor") => PaginationSpec::Cursor {
            after: raw.after.clone(),
            top: count("top", raw.top.as_deref(), defaults.top)?,
        },
        Some("paging") => PaginationSpec::Paging {
            page_number: count("pagenumber", raw.pagenumber.as_deref(), 1)?,
            page_size: count("pagesize", raw.pagesize.as_deref(), defaults.page_size)?,
        },
        Some(other) => {
            return Err(QueryError::InvalidPaginationSpec(format!(
                "unknown pagingtype '{}', expected offset, cursor or paging",
                other
            )))
        }
    };
    spec.validate()?;
    Ok(spec)
}

fn count(name: &str, value: Option<&str>, default: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| {
            QueryError::InvalidPaginationSpec(format!(
                "{} must be a non-negative integer, got '{}'",
                name, v
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Filter;
    use crate::query::sort::SortDirection;

    fn bind(query: &str) -> Result<QueryOptions> {
        QueryOptions::from_query_string(query, &ParamDefaults::default())
    }

    #[test]
    fn test_empty_query_uses_defaults() {
        let options = bind("").unwrap();
        assert_eq!(options, QueryOptions::default());
        assert_eq!(options.pagination, PaginationSpec::Offset { skip: 0, top: 10 });
    }

    #[test]
    fn test_binds_every_stage() {
        let options = bind(
            "filter=age%20gt%2030&orderby=name+desc&select=id,name&skip=5&top=2&route=ignored",
        )
        .unwrap();
        assert!(matches!(options.filter, Some(Filter::Comparison { .. })));
        let orderby = options.orderby.unwrap();
        assert_eq!(orderby[0].path.as_str(), "name");
        assert_eq!(orderby[0].direction, SortDirection::Desc);
        assert_eq!(options.select.map(|s| s.len()), Some(2));
        assert_eq!(options.pagination, PaginationSpec::Offset { skip: 5, top: 2 });
    }

    #[test]
    fn test_dollar_prefix_alias() {
        let options = bind("?$top=3&$pagingtype=cursor&$after=abc").unwrap();
        assert_eq!(
            options.pagination,
            PaginationSpec::Cursor {
                after: Some("abc".into()),
                top: 3
            }
        );
    }

    #[test]
    fn test_blank_values_are_absent() {
        let options = bind("filter=&select=%20&top=").unwrap();
        assert_eq!(options, QueryOptions::default());
    }

    #[test]
    fn test_last_occurrence_wins() {
        let options = bind("top=1&top=7").unwrap();
        assert_eq!(options.pagination, PaginationSpec::Offset { skip: 0, top: 7 });
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = ParamDefaults {
            top: 25,
            page_size: 50,
        };
        let options = QueryOptions::from_query_string("pagingtype=paging", &defaults).unwrap();
        assert_eq!(
            options.pagination,
            PaginationSpec::Paging {
                page_number: 1,
                page_size: 50
            }
        );
    }

    #[test]
    fn test_invalid_pagination() {
        for query in [
            "pagingtype=sideways",
            "top=-1",
            "skip=1.5",
            "top=ten",
            "pagingtype=paging&pagesize=0",
            "pagingtype=paging&pagenumber=0",
            "pagingtype=cursor&top=0",
        ] {
            assert!(
                matches!(bind(query), Err(QueryError::InvalidPaginationSpec(_))),
                "{}",
                query
            );
        }
    }

    #[test]
    fn test_offset_top_zero_allowed() {
        assert!(bind("top=0").is_ok());
    }

    #[test]
    fn test_bad_filter_is_parse_error() {
        assert!(matches!(bind("filter=a%20eq"), Err(QueryError::Parse(_))));
    }

    #[test]
    fn test_from_pairs() {
        let options = QueryOptions::from_pairs(
            [("select", "*"), ("orderby", "")],
            &ParamDefaults::default(),
        )
        .unwrap();
        assert_eq!(options.select, None);
        assert_eq!(options.orderby, None);
    }
}
