//! End-to-end tests for catalog loading, filtering and the persistent cart.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use storefront::Storefront;
use storefront::cart::CartChange;
use storefront::catalog::{CatalogLoadError, CatalogSource, Category, load_catalog};
use storefront::filter::{FilterChange, SortMode};
use storefront::presenter::{CATALOG_UNAVAILABLE, NoticeLevel};
use storefront::storage::{FileStore, MemoryStore};
use storefront_core::{CurrencyCode, Price, ProductId};
use storefront_integration_tests::{
    OneShotServer, RecordingPresenter, SCENARIO_CATALOG, SPANISH_CATALOG, catalog,
};

const KEY: &str = "esencia_romero_cart_v1";

fn id(s: &str) -> ProductId {
    ProductId::new(s)
}

fn storefront_with(json: &str, storage: MemoryStore) -> Storefront<MemoryStore, RecordingPresenter> {
    let mut storefront =
        Storefront::new(storage, KEY, RecordingPresenter::default(), CurrencyCode::EUR);
    storefront.install_catalog(Ok(catalog(json)));
    storefront
}

fn ids(storefront: &Storefront<MemoryStore, RecordingPresenter>) -> Vec<String> {
    storefront
        .filtered_products()
        .iter()
        .map(|p| p.id.to_string())
        .collect()
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("storefront-it-{name}-{}", std::process::id()))
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_ingredient_selection_is_and() {
    let mut storefront = storefront_with(SCENARIO_CATALOG, MemoryStore::new());

    storefront.on_filter_change(FilterChange::Ingredient {
        ingredient: "romero".to_string(),
        selected: true,
    });
    assert_eq!(ids(&storefront), ["a", "b"]);

    storefront.on_filter_change(FilterChange::Ingredient {
        ingredient: "oliva".to_string(),
        selected: true,
    });
    assert_eq!(ids(&storefront), ["a"]);

    let listing = storefront.presenter().last_listing().unwrap();
    assert_eq!(listing.count_label, "1 producto");
}

#[test]
fn test_combined_filters_and_reset() {
    let mut storefront = storefront_with(SPANISH_CATALOG, MemoryStore::new());
    assert_eq!(storefront.facets().price_ceiling, Price::from_minor_units(1500));

    storefront.on_filter_change(FilterChange::Category {
        category: Category::new("jabones-aceite"),
        selected: true,
    });
    storefront.on_filter_change(FilterChange::Search("  OLIVA ".to_string()));
    assert_eq!(ids(&storefront), ["jabon-nardo", "jabon-avena"]);

    storefront.on_filter_change(FilterChange::MaxPrice(Price::from_minor_units(600)));
    assert_eq!(ids(&storefront), ["jabon-avena"]);

    storefront.on_filter_change(FilterChange::Reset);
    assert_eq!(ids(&storefront).len(), 4);

    storefront.on_filter_change(FilterChange::InStockOnly(true));
    assert!(!ids(&storefront).contains(&"champu-ortiga".to_string()));
}

#[test]
fn test_name_sort_is_spanish() {
    let mut storefront = storefront_with(SPANISH_CATALOG, MemoryStore::new());
    storefront.on_filter_change(FilterChange::Sort(SortMode::Name));

    let names: Vec<&str> = storefront
        .filtered_products()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(
        names,
        ["avena", "Champú de ortiga", "Jabón de lavanda", "Ñora y nardo"]
    );
}

#[test]
fn test_no_results_is_distinct_from_load_failure() {
    let mut storefront = storefront_with(SCENARIO_CATALOG, MemoryStore::new());
    storefront.on_filter_change(FilterChange::Search("inexistente".to_string()));

    let listing = storefront.presenter().last_listing().unwrap();
    assert!(listing.is_empty());
    assert!(storefront.presenter().notices.is_empty());
    assert_eq!(storefront.catalog().len(), 2);
}

// ============================================================================
// Catalog loading
// ============================================================================

#[tokio::test]
async fn test_catalog_loads_over_http() {
    let server = OneShotServer::start(200, SPANISH_CATALOG).await.unwrap();
    let source = CatalogSource::Remote(server.url("products.json"));

    let mut storefront = Storefront::new(
        MemoryStore::new(),
        KEY,
        RecordingPresenter::default(),
        CurrencyCode::EUR,
    );
    storefront.load_catalog(&reqwest::Client::new(), &source).await;

    assert_eq!(storefront.catalog().len(), 4);
    let request = server.request().await.unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/products.json");

    let detail = storefront.product_detail(&id("jabon-lavanda")).unwrap();
    assert_eq!(detail.card.category_label, "Jabones de glicerina");
    assert_eq!(detail.card.price, "6,50 €");
}

#[tokio::test]
async fn test_catalog_http_failure_installs_empty_catalog() {
    let server = OneShotServer::start(500, r#"{"error": "boom"}"#).await.unwrap();
    let source = CatalogSource::Remote(server.url("products.json"));

    let result = load_catalog(&reqwest::Client::new(), &source).await;
    assert!(matches!(result, Err(CatalogLoadError::Status(500))));

    let mut storefront = Storefront::new(
        MemoryStore::new(),
        KEY,
        RecordingPresenter::default(),
        CurrencyCode::EUR,
    );
    storefront.install_catalog(result);

    assert!(storefront.catalog().is_empty());
    assert!(storefront.filtered_products().is_empty());
    let notice = storefront.presenter().notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, CATALOG_UNAVAILABLE);
}

#[tokio::test]
async fn test_catalog_from_file() {
    let dir = temp_dir("catalog");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("products.json");
    std::fs::write(&path, SCENARIO_CATALOG).unwrap();

    let source: CatalogSource = path.to_string_lossy().parse().unwrap();
    let catalog = load_catalog(&reqwest::Client::new(), &source).await.unwrap();
    assert_eq!(catalog.len(), 2);

    let missing = CatalogSource::File(dir.join("missing.json"));
    let result = load_catalog(&reqwest::Client::new(), &missing).await;
    assert!(matches!(result, Err(CatalogLoadError::Io { .. })));

    std::fs::remove_dir_all(&dir).unwrap();
}

// ============================================================================
// Cart
// ============================================================================

#[test]
fn test_cart_scenario() {
    let mut storefront = storefront_with(SCENARIO_CATALOG, MemoryStore::new());

    storefront.on_add(&id("a"));
    storefront.on_add(&id("b"));
    storefront.on_quantity_change(&id("a"), -1);
    assert_eq!(
        storefront.on_quantity_change(&id("a"), -1),
        CartChange::Unchanged
    );

    let lines = storefront.cart_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, id("b"));
    assert_eq!(lines[0].quantity, 1);
    assert_eq!(storefront.cart_subtotal(), Price::from_minor_units(400));
    assert_eq!(storefront.cart_count(), 1);

    let view = storefront.presenter().last_cart().unwrap();
    assert_eq!(view.subtotal, "4,00 €");
    assert_eq!(view.item_count, 1);
}

#[test]
fn test_cart_persists_across_sessions() {
    let dir = temp_dir("cart");
    let new_session = || {
        let mut storefront = Storefront::new(
            FileStore::new(&dir),
            KEY,
            RecordingPresenter::default(),
            CurrencyCode::EUR,
        );
        storefront.install_catalog(Ok(catalog(SPANISH_CATALOG)));
        storefront
    };

    let mut first = new_session();
    first.on_add(&id("jabon-nardo"));
    first.on_add(&id("jabon-lavanda"));
    first.on_add(&id("jabon-nardo"));
    first.on_add(&id("champu-ortiga"));

    let second = new_session();
    let lines: Vec<(&str, u32)> = second
        .cart_lines()
        .iter()
        .map(|l| (l.product_id.as_str(), l.quantity))
        .collect();
    assert_eq!(lines, [("jabon-nardo", 2), ("jabon-lavanda", 1)]);
    assert_eq!(second.cart_subtotal(), Price::from_minor_units(2050));

    // The persisted cart is rendered on start-up
    assert_eq!(second.presenter().carts[0].item_count, 3);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_corrupt_persisted_cart_starts_empty() {
    let storage = MemoryStore::with_slot(KEY, "[{\"id\": \"a\", \"quantity\": ");
    let mut storefront = storefront_with(SCENARIO_CATALOG, storage.clone());
    assert_eq!(storefront.cart_count(), 0);

    // The next mutation overwrites the corrupt slot
    storefront.on_add(&id("a"));
    let reloaded = storefront_with(SCENARIO_CATALOG, storage);
    assert_eq!(reloaded.cart_count(), 1);
}

#[test]
fn test_cart_listener_sees_every_mutation() {
    use std::sync::{Arc, Mutex};

    let mut storefront = storefront_with(SCENARIO_CATALOG, MemoryStore::new());
    let counts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&counts);
    storefront.subscribe_cart(move |cart| sink.lock().unwrap().push(cart.total_count()));

    storefront.on_add(&id("a"));
    storefront.on_add(&id("a"));
    storefront.on_remove(&id("a"));

    assert_eq!(*counts.lock().unwrap(), [1, 2, 0]);
}
