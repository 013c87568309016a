//! Shared list/pagination shapes.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 200;

/// Paged list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Total matching rows
    pub total: i64,

    /// Applied page size
    pub limit: i64,

    /// Applied offset
    pub offset: i64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }

    /// Single unpaged response covering every item.
    pub fn unpaged(items: Vec<T>) -> Self {
        let total = items.len() as i64;
        Self {
            items,
            total,
            limit: total,
            offset: 0,
        }
    }
}

/// Normalized limit/offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamp caller-supplied values into range.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        assert_eq!(Page::new(None, None), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(500), Some(-3)), Page { limit: 200, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(40)), Page { limit: 1, offset: 40 });
    }

    #[test]
    fn test_unpaged() {
        let list = ListResponse::unpaged(vec![1, 2, 3]);
        assert_eq!(list.total, 3);
        assert_eq!(list.limit, 3);
        assert_eq!(list.offset, 0);
    }
}
