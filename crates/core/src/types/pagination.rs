//! Pagination envelope used by the backend list endpoints.

use serde::{Deserialize, Serialize};

/// Page metadata as returned next to list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// Total number of records across all pages.
    pub total: u64,
    /// Current page, 1-based.
    pub page: u32,
    /// Number of pages.
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            pages: 1,
        }
    }
}

impl Pagination {
    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// One page of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Build a page from records and metadata.
    #[must_use]
    pub const fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { data, pagination }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Pagination::default())
    }
}

/// Clamp a requested page number to a valid 1-based page.
#[must_use]
pub fn normalize_page(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let first = Pagination {
            total: 25,
            page: 1,
            pages: 3,
        };
        assert!(!first.has_prev());
        assert!(first.has_next());

        let last = Pagination { page: 3, ..first };
        assert!(last.has_prev());
        assert!(!last.has_next());
    }

    #[test]
    fn test_empty_listing_has_no_next() {
        let empty = Pagination {
            total: 0,
            page: 1,
            pages: 0,
        };
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }
}
