use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Result<Self, ServiceError> {
        if page == 0 {
            return Err(ServiceError::validation("page", "page must be 1 or greater"));
        }
        if page_size == 0 {
            return Err(ServiceError::validation(
                "limit",
                "page size must be greater than 0",
            ));
        }
        Ok(Self { page, page_size })
    }

    fn offset(&self) -> usize {
        usize::try_from((self.page - 1).saturating_mul(self.page_size)).unwrap_or(usize::MAX)
    }
}

/// One page of an ordered listing plus its position metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T: Clone> Page<T> {
    /// Slices `all` for `request`. An out-of-range page yields no items but
    /// accurate metadata.
    pub fn slice(all: &[T], request: PageRequest) -> Self {
        Self::from_listing(all.iter(), request)
    }

    /// Like [`Page::slice`], but only clones the records on the requested
    /// page.
    pub fn from_listing<'a, I>(listing: I, request: PageRequest) -> Self
    where
        I: ExactSizeIterator<Item = &'a T>,
        T: 'a,
    {
        let total_items = listing.len() as u64;
        let total_pages = total_items.div_ceil(request.page_size).max(1);
        let page_size = usize::try_from(request.page_size).unwrap_or(usize::MAX);

        let items = listing
            .skip(request.offset())
            .take(page_size)
            .cloned()
            .collect();

        let has_prev = request.page > 1;
        let has_next = request.page < total_pages;

        Self {
            items,
            total_items,
            page: request.page,
            page_size: request.page_size,
            total_pages,
            has_prev,
            has_next,
            prev_page: has_prev.then(|| request.page - 1),
            next_page: has_next.then(|| request.page + 1),
        }
    }
}
