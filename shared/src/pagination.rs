//! Pagination types shared by list endpoints

use serde::{Deserialize, Serialize};

/// Default page size for catalog listings
pub const DEFAULT_PAGE_LIMIT: u32 = 100;
/// Largest page size a client may request
pub const MAX_PAGE_LIMIT: u32 = 250;

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// 1-based page number, never below 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_LIMIT`
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Number of records to skip
    pub fn offset(&self) -> usize {
        ((self.page() - 1) as usize) * self.limit() as usize
    }

    /// Slice an in-memory list into the requested page
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit() as usize)
            .collect();
        PaginatedResponse::new(data, total, self.page(), self.limit())
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            total.div_ceil(limit as u64) as u32
        } else {
            1
        };

        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Convert every item while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), DEFAULT_PAGE_LIMIT);

        let q = PageQuery {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_paginate_second_page() {
        let q = PageQuery {
            page: Some(2),
            limit: Some(3),
        };
        let resp = q.paginate((1..=8).collect::<Vec<_>>());
        assert_eq!(resp.data, vec![4, 5, 6]);
        assert_eq!(resp.total, 8);
        assert_eq!(resp.total_pages, 3);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let q = PageQuery {
            page: Some(5),
            limit: Some(10),
        };
        let resp = q.paginate(vec!["a", "b"]);
        assert!(resp.data.is_empty());
        assert_eq!(resp.total, 2);
        assert_eq!(resp.total_pages, 1);
    }
}
