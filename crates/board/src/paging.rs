//! Paged listing parameters and results.

use serde::{Deserialize, Serialize};

use scheduler_core::{DomainError, DomainResult, UserId};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page request, optionally filtered to one owner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub user_id: Option<UserId>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            user_id: None,
        }
    }
}

impl PageRequest {
    /// Build a request, filling defaults and rejecting out-of-range sizes.
    pub fn new(page: Option<u32>, size: Option<u32>, user_id: Option<UserId>) -> DomainResult<Self> {
        let request = Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE),
            user_id,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidPaging(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.page.checked_mul(self.size).is_none() {
            return Err(DomainError::InvalidPaging("page is out of range".to_string()));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
