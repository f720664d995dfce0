//! Page request normalization shared by catalog listing and verse pagination

use serde::Deserialize;
use tracing::warn;

/// Page number used when none (or an invalid one) is supplied
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when none (or an invalid one) is supplied
pub const DEFAULT_LIMIT: i64 = 10;

/// Normalized page request
///
/// Always satisfies `page >= 1` and `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Maximum number of items per page
    pub limit: i64,
}

impl PageRequest {
    /// Build a page request from raw, possibly missing or out-of-range values
    ///
    /// Missing values and values below 1 fall back to the defaults
    /// (page 1, limit 10).
    ///
    /// # Examples
    /// ```
    /// use mlib_common::PageRequest;
    ///
    /// let p = PageRequest::normalize(Some(3), Some(5));
    /// assert_eq!(p.offset(), 10);
    ///
    /// let p = PageRequest::normalize(Some(0), None);
    /// assert_eq!((p.page, p.limit), (1, 10));
    /// ```
    pub fn normalize(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p,
            Some(p) => {
                warn!(page = p, "Page is less than 1, defaulting to {}", DEFAULT_PAGE);
                DEFAULT_PAGE
            }
            None => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(l) if l >= 1 => l,
            Some(l) => {
                warn!(limit = l, "Limit is less than 1, defaulting to {}", DEFAULT_LIMIT);
                DEFAULT_LIMIT
            }
            None => DEFAULT_LIMIT,
        };

        Self { page, limit }
    }

    /// Row offset for SQL LIMIT/OFFSET queries
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Raw `page` / `limit` query parameters as sent by clients
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::normalize(query.page, query.limit)
    }
}
