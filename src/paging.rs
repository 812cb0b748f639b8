use serde::{Serialize, Serializer};

pub const DEFAULT_PAGE_SIZE: usize = 20;

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Items on a 1-based page. Pages outside the sequence come back empty.
pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = std::cmp::min(start.saturating_add(page_size), items.len());
    &items[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(usize),
    Gap,
}

impl Serialize for PageMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageMarker::Page(n) => serializer.serialize_u64(*n as u64),
            PageMarker::Gap => serializer.serialize_str("..."),
        }
    }
}

/// Compact page strip: first, last, and neighbours of the current page, with
/// every hole collapsed into a single gap marker.
pub fn page_window(current: usize, total: usize) -> Vec<PageMarker> {
    let mut out = Vec::new();
    let mut last_shown: Option<usize> = None;
    for p in 1..=total {
        let keep = p == 1 || p == total || p.abs_diff(current) <= 1;
        if !keep {
            continue;
        }
        if let Some(prev) = last_shown {
            if prev + 1 != p {
                out.push(PageMarker::Gap);
            }
        }
        out.push(PageMarker::Page(p));
        last_shown = Some(p);
    }
    out
}

/// `(from, to)` 1-based positions of the items shown on `page`, or `None`
/// when the page is empty.
pub fn shown_range(page: usize, page_size: usize, len: usize) -> Option<(usize, usize)> {
    if page == 0 || page_size == 0 {
        return None;
    }
    let from = (page - 1) * page_size + 1;
    if from > len {
        return None;
    }
    Some((from, std::cmp::min(page * page_size, len)))
}

/// Current page cursor. Navigation never wraps and never errors: stepping
/// past either end is a no-op and jumps are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl Pager {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.page < total
    }

    pub fn prev(&mut self) {
        if self.has_prev() {
            self.page -= 1;
        }
    }

    pub fn next(&mut self, total: usize) {
        if self.has_next(total) {
            self.page += 1;
        }
    }

    pub fn goto(&mut self, page: usize, total: usize) {
        self.page = page.clamp(1, total.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageMarker::{Gap, Page};

    #[test]
    fn twenty_five_people_make_two_pages() {
        let people: Vec<u32> = (0..25).collect();
        assert_eq!(total_pages(people.len(), 20), 2);
        assert_eq!(paginate(&people, 20, 1).len(), 20);
        assert_eq!(paginate(&people, 20, 2), &people[20..]);
        assert!(paginate(&people, 20, 3).is_empty());
        assert!(paginate(&people, 20, 0).is_empty());
    }

    #[test]
    fn pages_concatenate_back_to_the_sequence() {
        for len in [0usize, 1, 7, 20, 21, 40, 59] {
            for size in [1usize, 3, 20] {
                let items: Vec<usize> = (0..len).collect();
                let pages = total_pages(len, size);
                let mut joined = Vec::new();
                for p in 1..=pages {
                    let slice = paginate(&items, size, p);
                    assert!(slice.len() <= size);
                    joined.extend_from_slice(slice);
                }
                assert_eq!(joined, items, "len {} size {}", len, size);
            }
        }
    }

    #[test]
    fn empty_sequence_has_no_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(5, 0), 0);
        assert!(page_window(1, 0).is_empty());
    }

    #[test]
    fn window_collapses_gaps() {
        assert_eq!(page_window(1, 1), vec![Page(1)]);
        assert_eq!(page_window(1, 3), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(page_window(1, 10), vec![Page(1), Page(2), Gap, Page(10)]);
        assert_eq!(
            page_window(5, 10),
            vec![Page(1), Gap, Page(4), Page(5), Page(6), Gap, Page(10)]
        );
        assert_eq!(page_window(3, 10), vec![Page(1), Page(2), Page(3), Page(4), Gap, Page(10)]);
        assert_eq!(page_window(10, 10), vec![Page(1), Gap, Page(9), Page(10)]);
    }

    #[test]
    fn gap_serializes_as_ellipsis() {
        let v = serde_json::to_value(page_window(5, 10)).expect("ser");
        assert_eq!(v, serde_json::json!([1, "...", 4, 5, 6, "...", 10]));
    }

    #[test]
    fn pager_is_inert_at_the_edges() {
        let mut pager = Pager::default();
        pager.prev();
        assert_eq!(pager.page(), 1);
        pager.next(2);
        pager.next(2);
        assert_eq!(pager.page(), 2);
        assert!(!pager.has_next(2));
        pager.goto(99, 2);
        assert_eq!(pager.page(), 2);
        pager.goto(0, 2);
        assert_eq!(pager.page(), 1);
        pager.goto(4, 0);
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn shown_range_labels_partial_last_page() {
        assert_eq!(shown_range(1, 20, 25), Some((1, 20)));
        assert_eq!(shown_range(2, 20, 25), Some((21, 25)));
        assert_eq!(shown_range(3, 20, 25), None);
        assert_eq!(shown_range(1, 20, 0), None);
    }
}
