//! Catalog store: paginated listings, search results, and the current
//! product slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;
use tracing::instrument;

use sokoni_core::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Product, ProductPage, total_pages};

use crate::api::types::ProductEnvelope;
use crate::api::{ApiClient, ApiError};

use super::BusyGuard;

struct CatalogState {
    items: Vec<Product>,
    search_results: Vec<Product>,
    current_product: Option<Product>,
    query: String,
    page: u32,
    page_size: u32,
    total: u64,
    error: Option<String>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            search_results: Vec::new(),
            current_product: None,
            query: String::new(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
            error: None,
        }
    }
}

struct CatalogInner {
    api: ApiClient,
    state: RwLock<CatalogState>,
    in_flight: AtomicU32,
}

/// Owns paginated product listings, search results, and a single current
/// product. Nothing here persists; state is rebuilt per run.
///
/// Failure semantics mirror what display surfaces want: a failed listing
/// fetch keeps the previous `items`, a failed search clears
/// `search_results`, a failed product fetch clears `current_product` - and
/// every failure lands in `last_error()`.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<CatalogInner>,
}

impl CatalogStore {
    /// Create a store talking to the given backend.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                api,
                state: RwLock::new(CatalogState::default()),
                in_flight: AtomicU32::new(0),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch one page of the product listing, replacing `items`, `total`,
    /// and the page state on success.
    ///
    /// # Errors
    ///
    /// Returns the failure after recording it; `items` stays unmutated.
    #[instrument(skip(self))]
    pub async fn fetch_products(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<ProductPage, ApiError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let result: Result<ProductPage, ApiError> = self
            .inner
            .api
            .get_query(
                "/products",
                &[("page", page.to_string()), ("page_size", page_size.to_string())],
                None,
            )
            .await;

        match result {
            Ok(product_page) => {
                let mut state = self.inner.state.write().await;
                state.items = product_page.products.clone();
                state.total = product_page.total;
                state.page = page;
                state.page_size = page_size;
                drop(state);
                Ok(product_page)
            }
            Err(e) => {
                self.set_error(Some(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Search the catalog.
    ///
    /// A blank query clears `search_results` and the stored query and
    /// returns `Ok(None)` without issuing a request. On success the results
    /// replace `search_results`, `total`, and the page state.
    ///
    /// # Errors
    ///
    /// Returns the failure after recording it and clearing
    /// `search_results`.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Option<ProductPage>, ApiError> {
        if query.trim().is_empty() {
            let mut state = self.inner.state.write().await;
            state.search_results.clear();
            state.query.clear();
            return Ok(None);
        }

        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;
        self.inner.state.write().await.query = query.to_owned();

        let result: Result<ProductPage, ApiError> = self
            .inner
            .api
            .get_query(
                "/products/search",
                &[
                    ("q", query.to_owned()),
                    ("page", page.to_string()),
                    ("page_size", page_size.to_string()),
                ],
                None,
            )
            .await;

        match result {
            Ok(product_page) => {
                let mut state = self.inner.state.write().await;
                state.search_results = product_page.products.clone();
                state.total = product_page.total;
                state.page = page;
                state.page_size = page_size;
                drop(state);
                Ok(Some(product_page))
            }
            Err(e) => {
                let mut state = self.inner.state.write().await;
                state.search_results.clear();
                state.error = Some(e.to_string());
                drop(state);
                Err(e)
            }
        }
    }

    /// Fetch one page of a category-scoped listing; same replace and
    /// failure semantics as [`CatalogStore::fetch_products`].
    ///
    /// # Errors
    ///
    /// Returns the failure after recording it; `items` stays unmutated.
    #[instrument(skip(self))]
    pub async fn fetch_by_category(
        &self,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ProductPage, ApiError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let path = format!("/products/category/{}", urlencoding::encode(category));
        let result: Result<ProductPage, ApiError> = self
            .inner
            .api
            .get_query(
                &path,
                &[("page", page.to_string()), ("page_size", page_size.to_string())],
                None,
            )
            .await;

        match result {
            Ok(product_page) => {
                let mut state = self.inner.state.write().await;
                state.items = product_page.products.clone();
                state.total = product_page.total;
                state.page = page;
                state.page_size = page_size;
                drop(state);
                Ok(product_page)
            }
            Err(e) => {
                self.set_error(Some(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Fetch a single product into the `current_product` slot.
    ///
    /// A success with an empty envelope leaves the slot empty and returns
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the failure after recording it and clearing the slot.
    #[instrument(skip(self))]
    pub async fn fetch_product(&self, id: &str) -> Result<Option<Product>, ApiError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let result: Result<ProductEnvelope, ApiError> =
            self.inner.api.get(&format!("/products/{id}"), None).await;

        match result {
            Ok(envelope) => {
                self.inner.state.write().await.current_product = envelope.product.clone();
                Ok(envelope.product)
            }
            Err(e) => {
                let mut state = self.inner.state.write().await;
                state.current_product = None;
                state.error = Some(e.to_string());
                drop(state);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Local resets
    // =========================================================================

    /// Clear search results, the stored query, and the recorded error. No
    /// network activity.
    pub async fn clear_search(&self) {
        let mut state = self.inner.state.write().await;
        state.search_results.clear();
        state.query.clear();
        state.error = None;
    }

    /// Clear the recorded error.
    pub async fn clear_error(&self) {
        self.set_error(None).await;
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// Current listing page contents.
    pub async fn items(&self) -> Vec<Product> {
        self.inner.state.read().await.items.clone()
    }

    /// Current search results.
    pub async fn search_results(&self) -> Vec<Product> {
        self.inner.state.read().await.search_results.clone()
    }

    /// The single current product, if one is loaded.
    pub async fn current_product(&self) -> Option<Product> {
        self.inner.state.read().await.current_product.clone()
    }

    /// The last submitted search query.
    pub async fn query(&self) -> String {
        self.inner.state.read().await.query.clone()
    }

    /// Page number of the last successful fetch (1-based).
    pub async fn page(&self) -> u32 {
        self.inner.state.read().await.page
    }

    /// Page size of the last successful fetch.
    pub async fn page_size(&self) -> u32 {
        self.inner.state.read().await.page_size
    }

    /// Total item count reported by the last successful fetch.
    pub async fn total(&self) -> u64 {
        self.inner.state.read().await.total
    }

    /// `ceil(total / page_size)` for the current state.
    pub async fn total_pages(&self) -> u64 {
        let state = self.inner.state.read().await;
        total_pages(state.total, state.page_size)
    }

    /// Last recorded action error, for display.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    /// True while any catalog action is in flight.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Relaxed) > 0
    }

    async fn set_error(&self, error: Option<String>) {
        self.inner.state.write().await.error = error;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Backend address nothing listens on; reaching it fails fast, and
    /// operations that must not touch the network succeed against it.
    fn offline_store() -> CatalogStore {
        CatalogStore::new(ApiClient::new("http://127.0.0.1:9"))
    }

    #[tokio::test]
    async fn test_default_state() {
        let store = offline_store();
        assert!(store.items().await.is_empty());
        assert!(store.search_results().await.is_empty());
        assert_eq!(store.current_product().await, None);
        assert_eq!(store.page().await, 1);
        assert_eq!(store.page_size().await, 20);
        assert_eq!(store.total_pages().await, 0);
        assert!(!store.busy());
    }

    #[tokio::test]
    async fn test_blank_search_skips_network() {
        let store = offline_store();

        // Against an unreachable backend, any request would error; blank
        // queries must short-circuit instead.
        let result = store.search_products("", 1, 20).await.unwrap();
        assert_eq!(result, None);
        let result = store.search_products("   ", 1, 20).await.unwrap();
        assert_eq!(result, None);

        assert!(store.search_results().await.is_empty());
        assert_eq!(store.query().await, "");
        assert_eq!(store.last_error().await, None);
    }

    #[tokio::test]
    async fn test_failed_fetch_records_error_and_keeps_items() {
        let store = offline_store();

        let result = store.fetch_products(1, 20).await;
        assert!(result.is_err());
        assert!(store.last_error().await.is_some());
        assert!(store.items().await.is_empty());
        assert_eq!(store.page().await, 1);
    }

    #[tokio::test]
    async fn test_failed_search_clears_results_and_keeps_query() {
        let store = offline_store();

        let result = store.search_products("shoes", 1, 20).await;
        assert!(result.is_err());
        assert!(store.search_results().await.is_empty());
        assert_eq!(store.query().await, "shoes");
        assert!(store.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_clear_search_resets_query_results_and_error() {
        let store = offline_store();
        let _ = store.search_products("shoes", 1, 20).await;

        store.clear_search().await;
        assert_eq!(store.query().await, "");
        assert!(store.search_results().await.is_empty());
        assert_eq!(store.last_error().await, None);
    }

    #[tokio::test]
    async fn test_clear_error() {
        let store = offline_store();
        let _ = store.fetch_products(1, 20).await;
        assert!(store.last_error().await.is_some());

        store.clear_error().await;
        assert_eq!(store.last_error().await, None);
    }
}
