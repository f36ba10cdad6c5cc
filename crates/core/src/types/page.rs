//! Paged product listings.

use serde::{Deserialize, Serialize};

use crate::types::product::Product;

/// First page number. Pages are 1-based throughout the backend.
pub const DEFAULT_PAGE: u32 = 1;

/// Backend default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One page of a product listing, as the listing and search endpoints
/// return it: the page's items plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub total: u64,
}

/// Number of pages needed for `total` items at `page_size` per page.
///
/// `ceil(total / page_size)`; zero items means zero pages.
#[must_use]
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}
