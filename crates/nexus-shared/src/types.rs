//! Common types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: super::constants::DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let default = Self::default();
        Self {
            page: page.unwrap_or(default.page).max(1),
            limit: limit
                .unwrap_or(default.limit)
                .clamp(1, super::constants::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

/// Page metadata returned alongside paginated collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(total: u64, pagination: &Pagination) -> Self {
        let total_pages = ((total + pagination.limit as u64 - 1) / pagination.limit as u64) as u32;
        Self {
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages,
        }
    }
}
