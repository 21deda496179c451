//! Offset pagination.

use serde::{Deserialize, Serialize};

/// Page size used when the request asks for zero items.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on page sizes unless configured otherwise.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page size limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Size used for requests with `page_size == 0`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size served; larger requests are clamped.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// A request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page_number: u32,
    /// Items per page.
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Clamps the request into the configured limits.
    ///
    /// Page numbers below 1 become 1; a zero size becomes the default size.
    pub fn normalized(self, config: &PagingConfig) -> Self {
        let page_size = match self.page_size {
            0 => config.default_page_size,
            n => n,
        }
        .min(config.max_page_size.max(1));
        Self {
            page_number: self.page_number.max(1),
            page_size,
        }
    }

    /// Row offset of the first item.
    pub fn offset(&self) -> u64 {
        (self.page_number.max(1) as u64 - 1) * self.page_size as u64
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Records in this page.
    pub items: Vec<T>,
    /// Records matching the predicate across all pages.
    pub total: u64,
    /// 1-based page number served.
    pub page_number: u32,
    /// Page size served.
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }

    /// Returns `true` if a later page holds more items.
    pub fn has_next(&self) -> bool {
        (self.page_number as u64) < self.total_pages()
    }

    /// Transforms the items, keeping the paging fields.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}
