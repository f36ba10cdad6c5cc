//! Integration tests for the catalog store against the stub backend.
//!
//! The stub seeds forty-five products with cycling categories, so the page
//! counts and category sums asserted here are exact.

#![allow(clippy::unwrap_used)]

use sokoni_console::ApiClient;
use sokoni_console::stores::CatalogStore;
use sokoni_integration_tests::StubBackend;

fn catalog_over(backend: &StubBackend) -> CatalogStore {
    CatalogStore::new(ApiClient::new(&backend.api_base_url()))
}

// =============================================================================
// Listing and paging
// =============================================================================

#[tokio::test]
async fn test_fetch_products_pages_through_the_catalog() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    let first = catalog.fetch_products(1, 20).await.unwrap();
    assert_eq!(first.total, 45);
    assert_eq!(first.products.len(), 20);
    assert_eq!(catalog.total_pages().await, 3);
    assert_eq!(catalog.items().await.len(), 20);

    let last = catalog.fetch_products(3, 20).await.unwrap();
    assert_eq!(last.products.len(), 5);
    assert_eq!(catalog.page().await, 3);
}

#[tokio::test]
async fn test_fetch_by_category_filters_server_side() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    let page = catalog.fetch_by_category("shoes", 1, 20).await.unwrap();

    // Categories cycle over three values, so each holds a third.
    assert_eq!(page.total, 15);
    assert!(page.products.iter().all(|p| p.category == "shoes"));
    assert_eq!(catalog.total_pages().await, 1);
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_matches_product_names() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    let page = catalog
        .search_products("running", 1, 20)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page.total, 2);
    assert!(page.products.iter().all(|p| p.name.contains("Running")));
    assert_eq!(catalog.search_results().await.len(), 2);
    assert_eq!(catalog.query().await, "running");
    assert_eq!(backend.search_hits(), 1);
}

#[tokio::test]
async fn test_blank_search_makes_no_request() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    assert!(catalog.search_products("", 1, 20).await.unwrap().is_none());
    assert!(catalog.search_products("   ", 1, 20).await.unwrap().is_none());

    assert_eq!(backend.search_hits(), 0);
    assert!(catalog.search_results().await.is_empty());
    assert_eq!(catalog.query().await, "");
}

#[tokio::test]
async fn test_clear_search_drops_results_but_not_items() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    catalog.fetch_products(1, 20).await.unwrap();
    catalog.search_products("running", 1, 20).await.unwrap();
    catalog.clear_search().await;

    assert!(catalog.search_results().await.is_empty());
    assert_eq!(catalog.query().await, "");
    assert_eq!(catalog.items().await.len(), 20);
}

// =============================================================================
// Single product
// =============================================================================

#[tokio::test]
async fn test_fetch_product_sets_current_product() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    let product = catalog.fetch_product("p-7").await.unwrap().unwrap();

    assert_eq!(product.name, "Trail Running Shoes");
    assert!(product.has_discount());
    assert_eq!(catalog.current_product().await.unwrap().id, "p-7");
}

#[tokio::test]
async fn test_fetch_missing_product_records_error() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    catalog.fetch_product("p-7").await.unwrap();
    let err = catalog.fetch_product("p-999").await.unwrap_err();

    assert!(err.to_string().contains("Product not found"));
    // The stale product does not linger after a failed fetch.
    assert!(catalog.current_product().await.is_none());
    assert!(catalog.last_error().await.is_some());
}

#[tokio::test]
async fn test_out_of_stock_product_round_trips() {
    let backend = StubBackend::spawn().await;
    let catalog = catalog_over(&backend);

    let product = catalog.fetch_product("p-3").await.unwrap().unwrap();

    assert_eq!(product.stock, 0);
    assert!(!product.in_stock);
}
