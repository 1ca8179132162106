//! Page-number pagination over the article listing.

use std::num::NonZeroUsize;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("page {page} is beyond the last page")]
    OutOfRange { page: usize },
}

/// Slice bounds and navigation flags for one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
    pub start: usize,
    pub end: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Compute the window for a 1-based `page`.
    ///
    /// The first page is always valid, even for an empty listing, so the index
    /// can render an empty state.
    pub fn for_page(
        page: usize,
        page_size: NonZeroUsize,
        total: usize,
    ) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }

        let size = page_size.get();
        let start = (page - 1)
            .checked_mul(size)
            .ok_or(PaginationError::OutOfRange { page })?;
        if page > 1 && start >= total {
            return Err(PaginationError::OutOfRange { page });
        }

        let end = start.saturating_add(size).min(total);

        Ok(Self {
            page,
            page_size: size,
            start,
            end,
            has_previous: page > 1,
            has_next: start.saturating_add(size) < total,
        })
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start.min(items.len());
        let end = self.end.min(items.len());
        &items[start..end]
    }

    pub fn previous_page(&self) -> Option<usize> {
        self.has_previous.then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next.then(|| self.page + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> NonZeroUsize {
        NonZeroUsize::new(5).expect("non-zero")
    }

    #[test]
    fn first_page_of_twelve() {
        let window = PageWindow::for_page(1, five(), 12).expect("valid");
        assert_eq!((window.start, window.end), (0, 5));
        assert!(!window.has_previous);
        assert!(window.has_next);
        assert_eq!(window.next_page(), Some(2));
        assert_eq!(window.previous_page(), None);
    }

    #[test]
    fn last_partial_page_clamps_end() {
        let window = PageWindow::for_page(3, five(), 12).expect("valid");
        assert_eq!((window.start, window.end), (10, 12));
        assert!(window.has_previous);
        assert!(!window.has_next);
    }

    #[test]
    fn exact_multiple_has_no_next_page() {
        let window = PageWindow::for_page(2, five(), 10).expect("valid");
        assert_eq!((window.start, window.end), (5, 10));
        assert!(!window.has_next);
    }

    #[test]
    fn empty_listing_still_has_a_first_page() {
        let window = PageWindow::for_page(1, five(), 0).expect("valid");
        assert_eq!((window.start, window.end), (0, 0));
        assert!(!window.has_next);
    }

    #[test]
    fn page_zero_is_invalid() {
        assert_eq!(
            PageWindow::for_page(0, five(), 3),
            Err(PaginationError::InvalidPage)
        );
    }

    #[test]
    fn page_past_the_end_is_out_of_range() {
        assert_eq!(
            PageWindow::for_page(3, five(), 10),
            Err(PaginationError::OutOfRange { page: 3 })
        );
    }

    #[test]
    fn slice_returns_window_items() {
        let items: Vec<u32> = (0..7).collect();
        let window = PageWindow::for_page(2, five(), items.len()).expect("valid");
        assert_eq!(window.slice(&items), &[5, 6]);
    }
}
