//! Shared pagination types for API query parameters.
//!
//! All list endpoints use page-based pagination with `page` and `pageSize`
//! parameters. `page` is clamped to at least 1 and `pageSize` to [1, 100],
//! preventing both zero-result queries and excessive data fetching.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// These arrive as query-string values and are often `#[serde(flatten)]`ed
/// into larger query structs, which makes serde buffer them as strings -
/// hence the `DisplayFromStr` round-trip.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, starting at 1
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,

    /// Maximum number of items per page (default: 10, max: 100)
    #[serde(rename = "pageSize")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page_size: Option<i64>,
}

impl Pagination {
    /// Get the page number, clamped to at least 1.
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the page size, clamped to [1, MAX_PAGE_SIZE].
    #[inline]
    pub fn page_size(&self) -> i64 {
        self.page_size_or(DEFAULT_PAGE_SIZE)
    }

    /// Get the page size with a caller-supplied default, clamped to
    /// [1, MAX_PAGE_SIZE].
    #[inline]
    pub fn page_size_or(&self, default: i64) -> i64 {
        self.page_size.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip for the current page.
    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }

    /// Returns clamped `(page, pageSize)` only when the caller asked for
    /// pagination explicitly (both parameters present). Search endpoints
    /// fall back to the full filtered set otherwise.
    pub fn explicit(&self) -> Option<(i64, i64)> {
        match (self.page, self.page_size) {
            (Some(_), Some(_)) => Some((self.page(), self.page_size())),
            _ => None,
        }
    }
}

/// Generic paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T: ToSchema> {
    /// The items for the current page
    pub items: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Maximum items per page
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

impl<T: ToSchema> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
        }
    }

    /// Map the items into another representation, keeping the page metadata.
    pub fn map<U: ToSchema>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.explicit(), None);
    }

    #[test]
    fn page_clamping() {
        let p = Pagination {
            page: Some(0),
            page_size: None,
        };
        assert_eq!(p.page(), 1);

        let p = Pagination {
            page: Some(-3),
            page_size: None,
        };
        assert_eq!(p.page(), 1);

        let p = Pagination {
            page: Some(7),
            page_size: None,
        };
        assert_eq!(p.page(), 7);
    }

    #[test]
    fn page_size_clamping() {
        // Zero is clamped to 1
        let p = Pagination {
            page: None,
            page_size: Some(0),
        };
        assert_eq!(p.page_size(), 1);

        // Negative is clamped to 1
        let p = Pagination {
            page: None,
            page_size: Some(-5),
        };
        assert_eq!(p.page_size(), 1);

        // Over max is clamped to MAX_PAGE_SIZE
        let p = Pagination {
            page: None,
            page_size: Some(1000),
        };
        assert_eq!(p.page_size(), MAX_PAGE_SIZE);

        // Valid value passes through
        let p = Pagination {
            page: None,
            page_size: Some(50),
        };
        assert_eq!(p.page_size(), 50);
    }

    #[test]
    fn explicit_requires_both_parameters() {
        let p = Pagination {
            page: Some(2),
            page_size: None,
        };
        assert_eq!(p.explicit(), None);

        let p = Pagination {
            page: Some(2),
            page_size: Some(500),
        };
        assert_eq!(p.explicit(), Some((2, MAX_PAGE_SIZE)));
    }

    #[test]
    fn offset_follows_page() {
        let p = Pagination {
            page: Some(3),
            page_size: Some(20),
        };
        assert_eq!(p.offset(), 40);
    }
}
