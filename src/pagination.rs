pub const DEFAULT_PAGE_SIZE: usize = 75;

/// Number of page numbers shown around the current page.
const WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
    total_count: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 0,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size as u64) as usize
    }

    /// Records a new total and pulls the cursor back inside the valid range.
    pub fn set_total(&mut self, total_count: u64) {
        self.total_count = total_count;
        let last = self.total_pages().saturating_sub(1);
        if self.current_page > last {
            self.current_page = last;
        }
    }

    pub fn set_current(&mut self, page: usize) {
        self.current_page = page;
    }

    /// The page after the current one, if there is one.
    pub fn next_page(&self) -> Option<usize> {
        let next = self.current_page + 1;
        (next < self.total_pages()).then_some(next)
    }

    pub fn prev_page(&self) -> Option<usize> {
        self.current_page.checked_sub(1)
    }

    pub fn reset(&mut self) {
        self.current_page = 0;
        self.total_count = 0;
    }

    pub fn buttons(&self) -> Vec<PageButton> {
        page_buttons(self.current_page, self.total_pages())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    /// Zero-based page index.
    Page { index: usize, current: bool },
    Ellipsis,
}

/// Lays out the page buttons for `total_pages` pages with `current` selected.
///
/// Up to five numbers are centred on the current page and clamped to the
/// edges. The first and last pages are always present, with an ellipsis
/// wherever pages are skipped. No index appears twice.
pub fn page_buttons(current: usize, total_pages: usize) -> Vec<PageButton> {
    let page = |index: usize| PageButton::Page {
        index,
        current: index == current,
    };

    if total_pages <= WINDOW {
        return (0..total_pages).map(page).collect();
    }

    let start = if current <= WINDOW / 2 {
        0
    } else if current + WINDOW / 2 + 1 >= total_pages {
        total_pages - WINDOW
    } else {
        current - WINDOW / 2
    };
    let end = start + WINDOW;

    let mut buttons = Vec::with_capacity(WINDOW + 4);
    if start > 0 {
        buttons.push(page(0));
        if start > 1 {
            buttons.push(PageButton::Ellipsis);
        }
    }
    buttons.extend((start..end).map(page));
    if end < total_pages {
        if end < total_pages - 1 {
            buttons.push(PageButton::Ellipsis);
        }
        buttons.push(page(total_pages - 1));
    }
    buttons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(buttons: &[PageButton]) -> Vec<Option<usize>> {
        buttons
            .iter()
            .map(|b| match b {
                PageButton::Page { index, .. } => Some(*index),
                PageButton::Ellipsis => None,
            })
            .collect()
    }

    #[test]
    fn test_small_page_counts_show_every_page() {
        assert!(page_buttons(0, 0).is_empty());
        for total in 1..=5 {
            for current in 0..total {
                let buttons = page_buttons(current, total);
                assert_eq!(
                    indices(&buttons),
                    (0..total).map(Some).collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn test_ten_pages_centred_window() {
        let buttons = page_buttons(5, 10);
        assert_eq!(
            indices(&buttons),
            vec![Some(0), None, Some(3), Some(4), Some(5), Some(6), Some(7), None, Some(9)]
        );
        assert!(buttons.contains(&PageButton::Page {
            index: 5,
            current: true
        }));
    }

    #[test]
    fn test_window_clamps_at_edges_without_duplicates() {
        assert_eq!(
            indices(&page_buttons(0, 10)),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), None, Some(9)]
        );
        assert_eq!(
            indices(&page_buttons(9, 10)),
            vec![Some(0), None, Some(5), Some(6), Some(7), Some(8), Some(9)]
        );
        // window touches page 1, so no gap before it
        assert_eq!(
            indices(&page_buttons(3, 10)),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5), None, Some(9)]
        );
        assert_eq!(
            indices(&page_buttons(3, 6)),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );

        for total in 6..30 {
            for current in 0..total {
                let mut seen: Vec<usize> =
                    indices(&page_buttons(current, total)).into_iter().flatten().collect();
                let len = seen.len();
                seen.dedup();
                assert_eq!(seen.len(), len, "duplicate at {current}/{total}");
                assert_eq!(seen.first(), Some(&0));
                assert_eq!(seen.last(), Some(&(total - 1)));
                assert!(seen.contains(&current));
            }
        }
    }

    #[test]
    fn test_next_after_first_page_of_two_hundred() {
        let mut pagination = Pagination::default();
        pagination.set_total(200);
        assert_eq!(pagination.total_pages(), 3);
        assert_eq!(pagination.prev_page(), None);
        assert_eq!(pagination.next_page(), Some(1));

        pagination.set_current(2);
        assert_eq!(pagination.next_page(), None);
    }

    #[test]
    fn test_set_total_clamps_cursor() {
        let mut pagination = Pagination::new(10);
        pagination.set_total(100);
        pagination.set_current(9);
        pagination.set_total(25);
        assert_eq!(pagination.current_page(), 2);
        pagination.set_total(0);
        assert_eq!(pagination.current_page(), 0);
        assert_eq!(pagination.total_pages(), 0);
    }
}
