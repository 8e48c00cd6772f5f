//! Page/limit handling shared by every listing endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Raw `page`/`limit` query parameters. Values are kept as strings so that garbage input falls
/// back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn resolve(&self) -> Page {
        Page::new(parse_number(&self.page), parse_number(&self.limit))
    }
}

fn parse_number(raw: &Option<String>) -> Option<i64> {
    raw.as_deref().and_then(|value| value.trim().parse::<i64>().ok())
}

/// A validated page request: 1-based page number, limit within `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .filter(|value| *value >= 1)
            .map(|value| value.min(u32::MAX as i64) as u32)
            .unwrap_or(1);
        let limit = match limit {
            Some(value) if value >= 1 => value.min(MAX_PAGE_LIMIT as i64) as u32,
            _ => DEFAULT_PAGE_LIMIT,
        };
        Self { page, limit }
    }

    pub fn number(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of rows plus the total row count behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: Page,
}

impl<T> Paginated<T> {
    pub fn meta(&self) -> PaginationMeta {
        let limit = self.page.limit() as i64;
        PaginationMeta {
            total: self.total,
            page: self.page.number(),
            limit: self.page.limit(),
            pages: (self.total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_apply_when_parameters_missing() {
        let page = PageQuery::default().resolve();
        assert_eq!(page.number(), 1);
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn limit_is_clamped_to_maximum() {
        let page = query(Some("2"), Some("1000")).resolve();
        assert_eq!(page.limit(), MAX_PAGE_LIMIT);
        assert_eq!(page.offset(), 100);
    }

    #[test]
    fn garbage_and_non_positive_values_fall_back() {
        let page = query(Some("-3"), Some("abc")).resolve();
        assert_eq!(page, Page::default());

        let page = query(Some("zero"), Some("0")).resolve();
        assert_eq!(page, Page::default());
    }

    #[test]
    fn page_count_rounds_up() {
        let paginated = Paginated {
            data: vec![(); 20],
            total: 45,
            page: Page::new(Some(1), Some(20)),
        };
        let meta = paginated.meta();
        assert_eq!(meta.pages, 3);
        assert_eq!(meta.total, 45);

        let empty: Paginated<()> = Paginated {
            data: Vec::new(),
            total: 0,
            page: Page::default(),
        };
        assert_eq!(empty.meta().pages, 0);
    }
}
