//! Page arithmetic for newest-first track listings.

use serde::Serialize;

use crate::error::CoreError;

/// Default number of tracks per page.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Position of one page within a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: i64,
    pub per_page: i64,
    /// Total items in the listing scope.
    pub total: i64,
    /// Number of pages; at least 1 even when the scope is empty.
    pub num_pages: i64,
}

impl PageInfo {
    /// Validate `page` against `total` items and compute its window.
    ///
    /// Page numbers start at 1. Page 1 always exists (possibly empty); any
    /// other page past the last one is a not-found.
    pub fn new(page: i64, per_page: i64, total: i64) -> Result<Self, CoreError> {
        if page < 1 {
            return Err(CoreError::Validation(format!(
                "Page number must be at least 1, got {page}"
            )));
        }
        if per_page < 1 {
            return Err(CoreError::Validation("Page size must be at least 1".into()));
        }

        let num_pages = num_pages(total, per_page);
        if page > num_pages {
            return Err(CoreError::NotFoundByKey {
                entity: "Page",
                key: page.to_string(),
            });
        }

        Ok(Self {
            page,
            per_page,
            total,
            num_pages,
        })
    }

    /// SQL `OFFSET` for this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// SQL `LIMIT` for this page.
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Number of pages needed for `total` items, never less than 1.
pub fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        return 1;
    }
    (total + per_page - 1) / per_page
}
