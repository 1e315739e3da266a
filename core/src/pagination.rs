//! # Pagination
//!
//! Query-string driven paging and search shared by every listing endpoint.

use serde::Serialize;
use std::collections::HashMap;

/// Page returned when `page` is absent or unusable.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size returned when `limit` is absent or unusable.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 100;

/// Which slice of a listing the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// One-based page number.
    pub page: i64,
    /// Rows per page, between 1 and [`MAX_LIMIT`].
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Clamps `page` and `limit` into range, replacing non-positive values
    /// with the defaults.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: if page < 1 { DEFAULT_PAGE } else { page },
            limit: if limit < 1 {
                DEFAULT_LIMIT
            } else {
                limit.min(MAX_LIMIT)
            },
        }
    }

    /// Parses raw query values. Anything that is not an integer falls back
    /// to the default rather than failing the request.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: i64| {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        Self::new(parse(page, DEFAULT_PAGE), parse(limit, DEFAULT_LIMIT))
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed to show `total_entries` rows.
    pub fn total_pages(&self, total_entries: i64) -> i64 {
        if total_entries <= 0 {
            return 0;
        }
        (total_entries - 1) / self.limit + 1
    }
}

/// Paging plus the optional search term of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Requested page.
    pub page: PageRequest,
    /// Case-insensitive substring to match, if searching.
    pub search: Option<String>,
}

impl ListQuery {
    /// Reads `page`, `limit`, `identifier`, `query` and `name` from the query
    /// string.
    ///
    /// Searching only happens with `identifier=search`. The term comes from
    /// `query`, or `name` for clients that send it under that key.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str);
        let search = match get("identifier") {
            Some("search") => get("query")
                .filter(|q| !q.trim().is_empty())
                .or_else(|| get("name"))
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
            _ => None,
        };
        Self {
            page: PageRequest::parse(get("page"), get("limit")),
            search,
        }
    }
}

/// One page of results, serialized as the listing response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// The page number that was served.
    pub page: i64,
    /// Pages available at the requested limit.
    pub total_pages: i64,
    /// Rows matching the filter across all pages.
    pub total_entries: i64,
}

impl<T> Page<T> {
    /// Wraps `data` with totals computed for `request`.
    pub fn new(data: Vec<T>, total_entries: i64, request: &PageRequest) -> Self {
        Self {
            data,
            page: request.page,
            total_pages: request.total_pages(total_entries),
            total_entries,
        }
    }

    /// Converts every row, keeping the totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
            total_entries: self.total_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = ListQuery::from_params(&HashMap::new());
        assert_eq!(query.page, PageRequest::new(1, 10));
        assert_eq!(query.page.offset(), 0);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let page = PageRequest::parse(Some("two"), Some("ten"));
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        let page = PageRequest::parse(Some("0"), Some("-5"));
        assert_eq!(page.page, DEFAULT_PAGE);
        assert_eq!(page.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_is_capped() {
        assert_eq!(PageRequest::parse(None, Some("5000")).limit, MAX_LIMIT);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        assert_eq!(PageRequest::new(i64::MAX, 100).offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PageRequest::new(1, 10);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
    }

    #[test]
    fn test_search_requires_identifier() {
        let query = ListQuery::from_params(&params(&[("query", "anne")]));
        assert_eq!(query.search, None);

        let query = ListQuery::from_params(&params(&[("identifier", "search"), ("query", " anne ")]));
        assert_eq!(query.search.as_deref(), Some("anne"));
    }

    #[test]
    fn test_search_falls_back_to_name() {
        let query = ListQuery::from_params(&params(&[("identifier", "search"), ("name", "Otieno")]));
        assert_eq!(query.search.as_deref(), Some("Otieno"));

        let query = ListQuery::from_params(&params(&[("identifier", "search"), ("query", "")]));
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_page_serializes_with_totals() {
        let page = Page::new(vec![1, 2], 12, &PageRequest::new(2, 5));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": [1, 2], "page": 2, "total_pages": 3, "total_entries": 12})
        );
    }

    #[test]
    fn test_map_keeps_totals() {
        let page = Page::new(vec![1, 2], 2, &PageRequest::default()).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.total_entries, 2);
    }
}
