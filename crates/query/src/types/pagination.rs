//! Paginated results.

use serde::{Deserialize, Serialize};

/// Information about a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// The 1-based page number.
    pub current_page: u64,

    /// The requested page size.
    pub items_per_page: u64,

    /// Total count of matching items (absent in partial mode).
    pub total: Option<u64>,

    /// Whether there are more results after this page.
    pub has_next: bool,

    /// Whether there are results before this page.
    pub has_previous: bool,
}

impl PageInfo {
    /// Creates page info for a fully counted result set.
    pub fn counted(current_page: u64, items_per_page: u64, total: u64) -> Self {
        let seen = current_page.saturating_mul(items_per_page);
        Self {
            current_page,
            items_per_page,
            total: Some(total),
            has_next: items_per_page > 0 && seen < total,
            has_previous: current_page > 1,
        }
    }

    /// Creates page info for a partial (uncounted) result set.
    pub fn partial(current_page: u64, items_per_page: u64, has_next: bool) -> Self {
        Self {
            current_page,
            items_per_page,
            total: None,
            has_next,
            has_previous: current_page > 1,
        }
    }

    /// Returns the last page number, when the total is known.
    pub fn last_page(&self) -> Option<u64> {
        let total = self.total?;
        if self.items_per_page == 0 {
            return Some(1);
        }
        Some(total.div_ceil(self.items_per_page).max(1))
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,

    /// Pagination information.
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a new page with the given items and page info.
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if this page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps the items in this page.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counted_page_info() {
        let info = PageInfo::counted(2, 3, 7);
        assert!(info.has_next);
        assert!(info.has_previous);
        assert_eq!(info.last_page(), Some(3));

        let last = PageInfo::counted(3, 3, 7);
        assert!(!last.has_next);
    }

    #[test]
    fn test_last_page_of_empty_result() {
        assert_eq!(PageInfo::counted(1, 10, 0).last_page(), Some(1));
        assert_eq!(PageInfo::partial(1, 10, false).last_page(), None);
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2, 3], PageInfo::partial(1, 3, true));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert!(mapped.page_info.has_next);
    }
}
