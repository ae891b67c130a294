//! One-based page-number pagination with clamping.
//!
//! Listing pages accept a `?page=` query parameter. Anything that does not
//! parse as a number resolves to page 1; numbers past the end resolve to the
//! last page. A listing with no rows still renders as page 1 of 1.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBounds {
    /// Resolved one-based page number after clamping.
    pub number: u64,
    pub total_pages: u64,
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u64 {
        (self.number + 1).min(self.total_pages)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Resolves a raw `?page=` value against `total` items. Never fails:
    /// unparseable input becomes page 1, out-of-range input becomes the
    /// nearest valid page.
    pub fn resolve(&self, total: u64, requested: Option<&str>) -> PageBounds {
        let total_pages = total.div_ceil(u64::from(self.per_page)).max(1);
        let requested = requested
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(1);
        let number = requested.clamp(1, total_pages);
        PageBounds {
            number,
            total_pages,
            offset: (number - 1) * u64::from(self.per_page),
            limit: self.per_page,
        }
    }

    pub fn assemble<T>(&self, items: Vec<T>, total: u64, bounds: PageBounds) -> Page<T> {
        Page {
            items,
            number: bounds.number,
            total_pages: bounds.total_pages,
            total_items: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_thirteen_items_into_two_pages_of_ten() {
        let paginator = Paginator::new(10);

        let first = paginator.resolve(13, None);
        assert_eq!(first.number, 1);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.offset, 0);
        assert_eq!(first.limit, 10);

        let second = paginator.resolve(13, Some("2"));
        assert_eq!(second.number, 2);
        assert_eq!(second.offset, 10);
    }

    #[test]
    fn non_numeric_page_resolves_to_first() {
        let paginator = Paginator::new(10);
        for raw in ["abc", "", "1.5", "-3", "2x"] {
            let bounds = paginator.resolve(25, Some(raw));
            assert_eq!(bounds.number, 1, "{raw:?} should clamp to page 1");
        }
    }

    #[test]
    fn zero_page_resolves_to_first() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.resolve(25, Some("0")).number, 1);
    }

    #[test]
    fn overflowing_page_resolves_to_last() {
        let paginator = Paginator::new(10);
        let bounds = paginator.resolve(25, Some("99"));
        assert_eq!(bounds.number, 3);
        assert_eq!(bounds.offset, 20);
    }

    #[test]
    fn empty_listing_is_a_single_empty_page() {
        let paginator = Paginator::new(10);
        let bounds = paginator.resolve(0, Some("7"));
        assert_eq!(bounds.number, 1);
        assert_eq!(bounds.total_pages, 1);
        assert_eq!(bounds.offset, 0);
    }

    #[test]
    fn exact_multiple_has_no_phantom_page() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.resolve(20, Some("5")).total_pages, 2);
    }

    #[test]
    fn page_navigation_flags() {
        let paginator = Paginator::new(10);
        let bounds = paginator.resolve(25, Some("2"));
        let page = paginator.assemble(vec![0u8; 10], 25, bounds);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.previous_number(), 1);
        assert_eq!(page.next_number(), 3);
    }
}
