//! The storefront state object.
//!
//! [`Storefront`] owns the catalog, the active filters, the cart store and
//! the presenter. Its `on_*` methods are the only way state changes; each
//! one finishes the transition (persist, recompute, render) before it
//! returns.
//!
//! Checkout is split in three so the network call does not hold the state
//! borrowed:
//!
//! ```text
//! begin_checkout()  -> CheckoutTicket    (snapshot lines, disable control)
//! ticket.submit()   -> handoff | error   (async, owns its snapshot)
//! finish_checkout() -> open page | notice + re-enable control
//! ```

use storefront_core::{CurrencyCode, Price, ProductId};
use tracing::{debug, info, instrument, warn};

use crate::cart::{Cart, CartChange, CartLine, CartStore};
use crate::catalog::{self, Catalog, CatalogLoadError, CatalogSource, Facets, Product};
use crate::checkout::{
    CheckoutError, CheckoutGateway, CheckoutHandoff, PaymentRedirect, initiate_checkout,
};
use crate::error::{self, StorefrontError, add_breadcrumb};
use crate::filter::{FilterChange, FilterCriteria, apply_filters};
use crate::presenter::{CartView, CheckoutControl, Notice, Presenter, ProductDetail, ProductListing};
use crate::storage::KeyValueStore;

/// Owned storefront state.
pub struct Storefront<S, P> {
    catalog: Catalog,
    facets: Facets,
    criteria: FilterCriteria,
    cart: CartStore<S>,
    presenter: P,
    currency: CurrencyCode,
    checkout_in_flight: bool,
}

/// A cart snapshot taken by [`Storefront::begin_checkout`].
#[derive(Debug, Clone)]
pub struct CheckoutTicket {
    lines: Vec<CartLine>,
    currency: CurrencyCode,
}

impl CheckoutTicket {
    /// Lines being checked out.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Create the session and hand off to the payment page.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if session creation or the redirect fails.
    pub async fn submit(
        self,
        gateway: &dyn CheckoutGateway,
        redirect: &dyn PaymentRedirect,
    ) -> Result<CheckoutHandoff, CheckoutError> {
        initiate_checkout(&self.lines, self.currency, gateway, redirect).await
    }
}

impl<S: KeyValueStore, P: Presenter> Storefront<S, P> {
    /// Load the cart from `cart_key` and render it. The catalog starts empty
    /// until [`Self::install_catalog`] or [`Self::load_catalog`] runs.
    pub fn new(storage: S, cart_key: impl Into<String>, presenter: P, currency: CurrencyCode) -> Self {
        let catalog = Catalog::empty();
        let facets = catalog.facets();
        let mut storefront = Self {
            criteria: FilterCriteria::for_facets(&facets),
            catalog,
            facets,
            cart: CartStore::load(storage, cart_key),
            presenter,
            currency,
            checkout_in_flight: false,
        };
        if let Some(e) = storefront.cart.take_read_error() {
            // The cart already fell back to empty; nothing to tell the shopper
            StorefrontError::from(e).capture();
        }
        storefront.render_cart();
        storefront
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the catalog and install it.
    pub async fn load_catalog(&mut self, client: &reqwest::Client, source: &CatalogSource) {
        let result = catalog::load_catalog(client, source).await;
        self.install_catalog(result);
    }

    /// Install a loaded catalog, or an empty one plus a notice on failure.
    ///
    /// Filters are reset to the new catalog's facets.
    pub fn install_catalog(&mut self, result: Result<Catalog, CatalogLoadError>) {
        let catalog = match result {
            Ok(catalog) => {
                info!(count = catalog.len(), "Catalog installed");
                catalog
            }
            Err(e) => {
                let err = StorefrontError::from(e);
                err.capture();
                self.presenter.notify(Notice::error(err.user_message()));
                Catalog::empty()
            }
        };

        self.facets = catalog.facets();
        self.criteria = FilterCriteria::for_facets(&self.facets);
        self.catalog = catalog;
        self.render_products();
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn facets(&self) -> &Facets {
        &self.facets
    }

    #[must_use]
    pub const fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Catalog products passing the current filters, in display order.
    #[must_use]
    pub fn filtered_products(&self) -> Vec<&Product> {
        apply_filters(self.catalog.products(), &self.criteria)
    }

    /// Display model of the filtered listing.
    #[must_use]
    pub fn listing(&self) -> ProductListing {
        ProductListing::new(&self.filtered_products(), self.currency)
    }

    /// Detail view for one product.
    #[must_use]
    pub fn product_detail(&self, id: &ProductId) -> Option<ProductDetail> {
        self.catalog
            .get(id)
            .map(|p| ProductDetail::new(p, self.currency))
    }

    #[must_use]
    pub fn cart_lines(&self) -> &[CartLine] {
        self.cart.cart().lines()
    }

    #[must_use]
    pub fn cart_subtotal(&self) -> Price {
        self.cart.cart().subtotal()
    }

    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.cart.cart().total_count()
    }

    /// Display model of the cart.
    #[must_use]
    pub fn cart_view(&self) -> CartView {
        CartView::new(self.cart.cart(), self.currency)
    }

    #[must_use]
    pub const fn is_checkout_in_flight(&self) -> bool {
        self.checkout_in_flight
    }

    #[must_use]
    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Register a handler called after every cart mutation.
    pub fn subscribe_cart(&mut self, listener: impl FnMut(&Cart) + Send + 'static) {
        self.cart.subscribe(listener);
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Add one unit of a product. Unknown and sold-out products are ignored.
    pub fn on_add(&mut self, product_id: &ProductId) -> CartChange {
        let change = self.cart.add(&self.catalog, product_id);
        if change.is_mutation() {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
            if let Some(product) = self.catalog.get(product_id) {
                self.presenter.notify(Notice::added_to_cart(&product.name));
            }
            self.report_write_failure();
            self.render_cart();
        } else {
            debug!(%product_id, "Add ignored");
        }
        change
    }

    /// Change a line's quantity by `delta`; reaching zero removes it.
    pub fn on_quantity_change(&mut self, product_id: &ProductId, delta: i64) -> CartChange {
        let change = self.cart.change_quantity(product_id, delta);
        if change.is_mutation() {
            self.report_write_failure();
            self.render_cart();
        }
        change
    }

    /// Remove a line.
    pub fn on_remove(&mut self, product_id: &ProductId) -> CartChange {
        let change = self.cart.remove(product_id);
        if change.is_mutation() {
            add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", product_id.as_str())]));
            self.report_write_failure();
            self.render_cart();
        }
        change
    }

    /// Apply a filter change and re-render the listing.
    pub fn on_filter_change(&mut self, change: FilterChange) {
        self.criteria.apply(change, &self.facets);
        self.render_products();
    }

    /// Snapshot the cart and disable the checkout control.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InFlight` while another checkout is pending
    /// and `CheckoutError::EmptyCart` for an empty cart. Neither shows a
    /// notice.
    pub fn begin_checkout(&mut self) -> Result<CheckoutTicket, CheckoutError> {
        if self.checkout_in_flight {
            return Err(CheckoutError::InFlight);
        }
        if self.cart.cart().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.checkout_in_flight = true;
        self.presenter.set_checkout_control(CheckoutControl::Busy);
        add_breadcrumb("checkout", "Checkout started", None);

        Ok(CheckoutTicket {
            lines: self.cart_lines().to_vec(),
            currency: self.currency,
        })
    }

    /// Complete a checkout started with [`Self::begin_checkout`].
    ///
    /// On success the payment page is opened. On failure the shopper gets a
    /// notice, the control is re-enabled and the cart is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the checkout failure wrapped in `StorefrontError`.
    pub fn finish_checkout(
        &mut self,
        result: Result<CheckoutHandoff, CheckoutError>,
    ) -> error::Result<CheckoutHandoff> {
        self.checkout_in_flight = false;

        match result {
            Ok(handoff) => {
                info!(session_id = %handoff.session_id, "Checkout handed off");
                self.presenter.open_checkout(&handoff.url);
                Ok(handoff)
            }
            Err(e) => {
                let err = StorefrontError::from(e);
                warn!(error = %err, "Checkout failed");
                err.capture();
                self.presenter.notify(Notice::error(err.user_message()));
                self.presenter.set_checkout_control(CheckoutControl::Enabled);
                Err(err)
            }
        }
    }

    /// Run a whole checkout.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Checkout` if the checkout was rejected or
    /// failed.
    #[instrument(skip_all, fields(lines = self.cart_lines().len()))]
    pub async fn on_checkout(
        &mut self,
        gateway: &dyn CheckoutGateway,
        redirect: &dyn PaymentRedirect,
    ) -> error::Result<CheckoutHandoff> {
        let ticket = self.begin_checkout()?;
        let result = ticket.submit(gateway, redirect).await;
        self.finish_checkout(result)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Tell the shopper a cart change was not saved. The change itself stands.
    fn report_write_failure(&mut self) {
        if let Some(e) = self.cart.take_write_error() {
            let err = StorefrontError::from(e);
            err.capture();
            self.presenter.notify(Notice::error(err.user_message()));
        }
    }

    fn render_products(&mut self) {
        let listing = self.listing();
        self.presenter.render_products(&listing);
    }

    fn render_cart(&mut self) {
        let view = self.cart_view();
        self.presenter.render_cart(&view);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use storefront_core::CheckoutSessionId;
    use url::Url;

    use super::*;
    use crate::checkout::{CheckoutRequest, CheckoutRequestError, HostedRedirect};
    use crate::presenter::{CART_NOT_SAVED, CATALOG_UNAVAILABLE, CHECKOUT_FAILED, NoticeLevel};
    use crate::storage::{MemoryStore, StorageReadError, StorageWriteError};

    const KEY: &str = "esencia_romero_cart_v1";

    #[derive(Default)]
    struct Recorder {
        listings: Vec<ProductListing>,
        carts: Vec<CartView>,
        notices: Vec<Notice>,
        controls: Vec<CheckoutControl>,
        opened: Vec<Url>,
    }

    impl Presenter for Recorder {
        fn render_products(&mut self, listing: &ProductListing) {
            self.listings.push(listing.clone());
        }

        fn render_cart(&mut self, cart: &CartView) {
            self.carts.push(cart.clone());
        }

        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }

        fn set_checkout_control(&mut self, control: CheckoutControl) {
            self.controls.push(control);
        }

        fn open_checkout(&mut self, url: &Url) {
            self.opened.push(url.clone());
        }
    }

    struct StubGateway {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubGateway {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl CheckoutGateway for StubGateway {
        async fn create_session(
            &self,
            _request: &CheckoutRequest,
        ) -> Result<CheckoutSessionId, CheckoutRequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CheckoutRequestError::Api {
                    status: 500,
                    message: "server error (500)".to_string(),
                })
            } else {
                Ok(CheckoutSessionId::new("cs_test_42"))
            }
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"[
            {"id": "a", "name": "Jabón de romero", "price": 9.5, "category": "jabones-aceite", "ingredients": ["oliva", "romero"]},
            {"id": "b", "name": "Champú de ortiga", "price": 4, "category": "champus-solidos", "ingredients": ["romero"]},
            {"id": "z", "name": "Vela", "price": 12, "category": "velas", "stock": false}
        ]"#,
        )
        .unwrap()
    }

    fn storefront() -> Storefront<MemoryStore, Recorder> {
        let mut storefront =
            Storefront::new(MemoryStore::new(), KEY, Recorder::default(), CurrencyCode::EUR);
        storefront.install_catalog(Ok(catalog()));
        storefront
    }

    fn id(s: &str) -> ProductId {
        ProductId::new(s)
    }

    fn redirect() -> HostedRedirect {
        HostedRedirect::new("https://pay.example/{CHECKOUT_SESSION_ID}")
    }

    #[test]
    fn test_new_renders_persisted_cart() {
        let storage = MemoryStore::with_slot(
            KEY,
            r#"[{"id": "a", "name": "Jabón de romero", "price": "9.50", "image": "", "quantity": 2}]"#,
        );
        let storefront = Storefront::new(storage, KEY, Recorder::default(), CurrencyCode::EUR);
        assert_eq!(storefront.cart_count(), 2);
        assert_eq!(storefront.presenter().carts[0].subtotal, "19,00 €");
    }

    #[test]
    fn test_install_catalog_failure_shows_notice() {
        let mut storefront =
            Storefront::new(MemoryStore::new(), KEY, Recorder::default(), CurrencyCode::EUR);
        storefront.install_catalog(Err(CatalogLoadError::Status(500)));

        assert!(storefront.catalog().is_empty());
        let notices = &storefront.presenter().notices;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, CATALOG_UNAVAILABLE);
        assert!(storefront.presenter().listings.last().unwrap().is_empty());
    }

    #[test]
    fn test_ingredient_filter_scenario() {
        let mut storefront = storefront();
        for ingredient in ["romero", "oliva"] {
            storefront.on_filter_change(FilterChange::Ingredient {
                ingredient: ingredient.to_string(),
                selected: true,
            });
        }

        let ids: Vec<&str> = storefront
            .filtered_products()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["a"]);
        assert_eq!(storefront.presenter().listings.last().unwrap().count_label, "1 producto");

        storefront.on_filter_change(FilterChange::Reset);
        assert_eq!(storefront.filtered_products().len(), 3);
        assert_eq!(storefront.criteria().max_price, storefront.facets().price_ceiling);
    }

    #[test]
    fn test_cart_scenario_renders_each_mutation() {
        let mut storefront = storefront();
        storefront.on_add(&id("a"));
        storefront.on_add(&id("b"));
        storefront.on_quantity_change(&id("a"), -1);
        storefront.on_quantity_change(&id("a"), -1);

        let lines = storefront.cart_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, id("b"));
        assert_eq!(storefront.cart_subtotal(), Price::from_minor_units(400));

        // Initial render plus three mutations; the second decrement is a no-op
        let carts = &storefront.presenter().carts;
        assert_eq!(carts.len(), 4);
        assert_eq!(carts.last().unwrap().subtotal, "4,00 €");

        let notices = &storefront.presenter().notices;
        assert_eq!(notices[0].message, "\"Jabón de romero\" añadido al carrito");
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageReadError> {
            Ok(None)
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<(), StorageWriteError> {
            Err(StorageWriteError::Unavailable("read-only".to_string()))
        }
    }

    #[test]
    fn test_unsaved_cart_change_shows_notice_and_stands() {
        let mut storefront =
            Storefront::new(ReadOnlyStore, KEY, Recorder::default(), CurrencyCode::EUR);
        storefront.install_catalog(Ok(catalog()));

        assert_eq!(storefront.on_add(&id("a")), CartChange::Added);
        assert_eq!(storefront.cart_count(), 1);

        let notices = &storefront.presenter().notices;
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[1].level, NoticeLevel::Error);
        assert_eq!(notices[1].message, CART_NOT_SAVED);

        storefront.on_remove(&id("a"));
        assert_eq!(storefront.presenter().notices.len(), 3);
        assert_eq!(storefront.presenter().carts.last().unwrap().item_count, 0);
    }

    #[test]
    fn test_corrupt_persisted_cart_is_silent() {
        let storage = MemoryStore::with_slot(KEY, "{not json");
        let storefront = Storefront::new(storage, KEY, Recorder::default(), CurrencyCode::EUR);
        assert_eq!(storefront.cart_count(), 0);
        assert!(storefront.presenter().notices.is_empty());
    }

    #[test]
    fn test_add_sold_out_is_silent() {
        let mut storefront = storefront();
        assert_eq!(storefront.on_add(&id("z")), CartChange::Unchanged);
        assert!(storefront.presenter().notices.is_empty());
        assert_eq!(storefront.cart_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_makes_no_call() {
        let mut storefront = storefront();
        let gateway = StubGateway::new(false);

        let result = storefront.on_checkout(&gateway, &redirect()).await;
        assert!(matches!(
            result,
            Err(StorefrontError::Checkout(CheckoutError::EmptyCart))
        ));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(storefront.presenter().notices.is_empty());
        assert!(storefront.presenter().controls.is_empty());
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart_and_reenables_control() {
        let mut storefront = storefront();
        storefront.on_add(&id("a"));
        let before = storefront.cart_lines().to_vec();

        let result = storefront.on_checkout(&StubGateway::new(true), &redirect()).await;
        assert!(result.is_err());

        assert_eq!(storefront.cart_lines(), before.as_slice());
        assert!(!storefront.is_checkout_in_flight());
        let presenter = storefront.presenter();
        assert_eq!(
            presenter.controls,
            [CheckoutControl::Busy, CheckoutControl::Enabled]
        );
        assert_eq!(presenter.notices.last().unwrap().message, CHECKOUT_FAILED);
        assert!(presenter.opened.is_empty());
    }

    #[tokio::test]
    async fn test_successful_checkout_opens_payment_page() {
        let mut storefront = storefront();
        storefront.on_add(&id("b"));

        let handoff = storefront
            .on_checkout(&StubGateway::new(false), &redirect())
            .await
            .unwrap();
        assert_eq!(handoff.session_id.as_str(), "cs_test_42");
        assert_eq!(
            storefront.presenter().opened[0].as_str(),
            "https://pay.example/cs_test_42"
        );
        assert_eq!(storefront.cart_count(), 1);
    }

    #[tokio::test]
    async fn test_second_checkout_while_in_flight_is_rejected() {
        let mut storefront = storefront();
        storefront.on_add(&id("a"));
        let gateway = StubGateway::new(false);

        let ticket = storefront.begin_checkout().unwrap();
        assert!(matches!(
            storefront.begin_checkout(),
            Err(CheckoutError::InFlight)
        ));

        // Other interactions stay live while the request is pending
        storefront.on_add(&id("b"));
        assert_eq!(ticket.lines().len(), 1);

        let result = ticket.submit(&gateway, &redirect()).await;
        storefront.finish_checkout(result).unwrap();
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert!(!storefront.is_checkout_in_flight());
    }
}
