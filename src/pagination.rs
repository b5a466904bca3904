//! Page arithmetic for post listings.
//!
//! Lenient page selection: a missing or non-numeric `?page=` means the first
//! page, anything outside `1..=num_pages` means the last one.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Posts per listing page.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<String>,
}

/// The slice of a result set one page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self { Self::new(PAGE_SIZE) }
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self { per_page: per_page.max(1) }
    }

    pub fn num_pages(&self, count: u64) -> u64 {
        // an empty listing still has one (empty) page
        count.div_ceil(self.per_page).max(1)
    }

    pub fn window(&self, count: u64, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.map(str::trim) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 && n as u64 <= num_pages => n as u64,
                Ok(_) => num_pages,
                // integers too wide for i64 are still out of range
                Err(_) if is_integer(raw) => num_pages,
                Err(_) => 1,
            },
        };
        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, count: u64, items: Vec<T>) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count,
            has_next: window.number < window.num_pages,
            has_previous: window.number > 1,
        }
    }
}
