use reqwest::header::HeaderMap;
use serde_json::Value;

pub const TOTAL_HEADER: &str = "x-wp-total";
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Collection totals reported by WordPress. Zero means "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub total_pages: u64,
}

impl PageInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            total: header_count(headers, TOTAL_HEADER),
            total_pages: header_count(headers, TOTAL_PAGES_HEADER),
        }
    }
}

/// Parse a non-negative integer header; missing or malformed values give 0.
pub fn header_count(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Decoded response body together with its pagination headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated {
    pub body: Value,
    pub page: PageInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> ListResult<T> {
    pub fn new(items: Vec<T>, page: PageInfo) -> Self {
        Self {
            items,
            total: page.total,
            total_pages: page.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
