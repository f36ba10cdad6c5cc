//! Integration tests for cart persistence.
//!
//! The cart store only talks to the persistence port; the stub backend is
//! here to supply real catalog products to add, and to prove sign-out
//! leaves the cart entry alone.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use sokoni_console::ApiClient;
use sokoni_console::storage::{FileStore, KvStore, MemoryStore, SharedKv, keys};
use sokoni_console::stores::{CartStore, CatalogStore, SessionStore};
use sokoni_core::NewUser;
use sokoni_integration_tests::StubBackend;

// =============================================================================
// Totals from live products
// =============================================================================

#[tokio::test]
async fn test_cart_totals_from_fetched_products() {
    let backend = StubBackend::spawn().await;
    let catalog = CatalogStore::new(ApiClient::new(&backend.api_base_url()));
    let cart = CartStore::new(Arc::new(MemoryStore::new()));

    let p10 = catalog.fetch_product("p-10").await.unwrap().unwrap();
    let p5 = catalog.fetch_product("p-5").await.unwrap().unwrap();
    cart.add_item(&p10, 2);
    cart.add_item(&p5, 3);

    assert_eq!(cart.count(), 5);
    assert_eq!(cart.total(), Decimal::from(35));
}

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let backend = StubBackend::spawn().await;
    let catalog = CatalogStore::new(ApiClient::new(&backend.api_base_url()));
    let cart = CartStore::new(Arc::new(MemoryStore::new()));

    let product = catalog.fetch_product("p-10").await.unwrap().unwrap();
    cart.add_item(&product, 1);
    cart.add_item(&product, 2);

    let lines = cart.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity, 3);
}

// =============================================================================
// Persistence across instances
// =============================================================================

#[tokio::test]
async fn test_cart_survives_process_restart() {
    let backend = StubBackend::spawn().await;
    let catalog = CatalogStore::new(ApiClient::new(&backend.api_base_url()));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let cart = CartStore::new(Arc::new(FileStore::open(&path).unwrap()));
    let product = catalog.fetch_product("p-10").await.unwrap().unwrap();
    cart.add_item(&product, 2);

    // A fresh store over the same file sees the same lines.
    let restored = CartStore::new(Arc::new(FileStore::open(&path).unwrap()));
    assert_eq!(restored.count(), 2);
    let lines = restored.lines();
    assert_eq!(lines.first().unwrap().product_id, "p-10");
    assert_eq!(restored.total(), Decimal::from(20));
}

#[tokio::test]
async fn test_logout_leaves_cart_entry_alone() {
    let backend = StubBackend::spawn().await;
    let kv: SharedKv = Arc::new(MemoryStore::new());
    let catalog = CatalogStore::new(ApiClient::new(&backend.api_base_url()));
    let session = SessionStore::new(ApiClient::new(&backend.api_base_url()), Arc::clone(&kv));
    let cart = CartStore::new(Arc::clone(&kv));

    session
        .register(&NewUser {
            first_name: "Amina".to_owned(),
            last_name: "Okafor".to_owned(),
            email: "amina@example.com".to_owned(),
            password: "correct-horse".to_owned(),
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    let product = catalog.fetch_product("p-10").await.unwrap().unwrap();
    cart.add_item(&product, 2);

    session.logout().await;

    // Tokens are gone; the guest keeps their cart.
    assert_eq!(kv.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert!(kv.get(keys::CART).unwrap().is_some());
    let restored = CartStore::new(Arc::clone(&kv));
    assert_eq!(restored.count(), 2);
}
