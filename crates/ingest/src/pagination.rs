//! Pagination cursor driven by the API's own result count.

use crate::adapter::AdaptedPage;

/// Tracks progress through a paginated listing.
///
/// When the API reports a result count the cursor stops once that many
/// items have been seen. Without it, a short page ends the listing. An empty
/// page always does.
#[derive(Debug, Clone)]
pub struct PageCursor {
    next: u32,
    page_size: u32,
    max_pages: u32,
    items_seen: u64,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(page_size: u32, max_pages: u32) -> Self {
        Self {
            next: 0,
            page_size: page_size.max(1),
            max_pages,
            items_seen: 0,
            exhausted: false,
        }
    }

    /// Page to fetch next, or `None` when the listing or the page cap is done.
    pub fn next_page(&self) -> Option<u32> {
        (!self.exhausted && self.next < self.max_pages).then_some(self.next)
    }

    /// More data exists but `max_pages` stopped the walk.
    pub fn hit_page_cap(&self) -> bool {
        !self.exhausted && self.next >= self.max_pages
    }

    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Offset of the next request: everything received so far.
    pub fn offset(&self) -> u64 {
        self.items_seen
    }

    /// Record a fetched page and decide whether another one exists.
    pub fn advance(&mut self, page: &AdaptedPage) {
        self.items_seen += page.len() as u64;
        self.next += 1;
        self.exhausted = !has_more(
            self.items_seen,
            page.len(),
            self.page_size,
            page.result_count(),
        );
    }
}

fn has_more(items_seen: u64, page_len: usize, page_size: u32, result_count: Option<u64>) -> bool {
    if page_len == 0 {
        return false;
    }
    match result_count {
        Some(total) => items_seen < total,
        None => page_len >= page_size as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(len: usize, filtered: Option<u64>) -> AdaptedPage {
        AdaptedPage {
            items: (0..len).map(|_| Ok(Default::default())).collect(),
            records_total: None,
            records_filtered: filtered,
        }
    }

    #[test]
    fn stops_at_reported_count() {
        let mut cursor = PageCursor::new(100, 50);
        assert_eq!(cursor.next_page(), Some(0));

        cursor.advance(&page(100, Some(250)));
        assert_eq!(cursor.next_page(), Some(1));
        cursor.advance(&page(100, Some(250)));
        cursor.advance(&page(50, Some(250)));

        assert_eq!(cursor.next_page(), None);
        assert_eq!(cursor.items_seen(), 250);
        assert!(!cursor.hit_page_cap());
    }

    #[test]
    fn reported_count_beats_page_length() {
        // A full page is not "more" if the API says everything has been seen.
        let mut cursor = PageCursor::new(10, 50);
        cursor.advance(&page(10, Some(10)));
        assert_eq!(cursor.next_page(), None);

        // And a short page is not the end if the API says otherwise.
        let mut cursor = PageCursor::new(10, 50);
        cursor.advance(&page(7, Some(30)));
        assert_eq!(cursor.next_page(), Some(1));
        assert_eq!(cursor.offset(), 7);
    }

    #[test]
    fn short_page_ends_without_metadata() {
        let mut cursor = PageCursor::new(10, 50);
        cursor.advance(&page(10, None));
        assert_eq!(cursor.next_page(), Some(1));
        cursor.advance(&page(3, None));
        assert_eq!(cursor.next_page(), None);
    }

    #[test]
    fn empty_page_ends() {
        let mut cursor = PageCursor::new(10, 50);
        cursor.advance(&page(0, Some(500)));
        assert_eq!(cursor.next_page(), None);
    }

    #[test]
    fn page_cap_is_reported() {
        let mut cursor = PageCursor::new(10, 2);
        cursor.advance(&page(10, Some(100)));
        cursor.advance(&page(10, Some(100)));
        assert_eq!(cursor.next_page(), None);
        assert!(cursor.hit_page_cap());
    }
}
