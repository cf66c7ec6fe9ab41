// Page math shared by the JSON API, the HTML views and the client presenter.
// Pure functions only: every input is clamped, nothing is rejected.
use serde::{Deserialize, Serialize};

/// Pagination metadata as it travels over the wire.
///
/// Field names are part of the frontend contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl PageMeta {
    pub fn navigation(&self) -> Navigation {
        Navigation::new(self.current_page, self.total_pages)
    }
}

/// One bounded slice of a collection plus its position in the whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of resolving a requested page against a collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
}

impl PageWindow {
    pub fn compute(total_count: u64, page_size: u32, requested_page: i64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(u64::from(page_size)).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        let current_page = requested_page.clamp(1, i64::from(total_pages)) as u32;

        Self {
            current_page,
            total_pages,
            total_count,
            page_size,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta {
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_count: self.total_count,
        }
    }

    pub fn navigation(&self) -> Navigation {
        Navigation::new(self.current_page, self.total_pages)
    }
}

/// Targets for the First / Previous / numbered / Next / Last controls.
/// A `None` target means the control is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub current: u32,
    pub total_pages: u32,
    pub first: Option<u32>,
    pub previous: Option<u32>,
    pub next: Option<u32>,
    pub last: Option<u32>,
}

impl Navigation {
    pub fn new(current: u32, total_pages: u32) -> Self {
        let total_pages = total_pages.max(1);
        let current = current.clamp(1, total_pages);
        let at_start = current == 1;
        let at_end = current == total_pages;

        Self {
            current,
            total_pages,
            first: (!at_start).then_some(1),
            previous: (!at_start).then(|| current - 1),
            next: (!at_end).then(|| current + 1),
            last: (!at_end).then_some(total_pages),
        }
    }

    /// Page numbers for the numbered buttons, always at least `[1]`.
    pub fn pages(&self) -> Vec<u32> {
        (1..=self.total_pages).collect()
    }
}

/// Lenient parse of a `page` query parameter. Anything unusable means page 1.
pub fn parse_page_param(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}
