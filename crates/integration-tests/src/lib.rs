//! Integration tests for the Esencia de Romero storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-integration-tests
//! ```
//!
//! The tests need no external services. The catalog and checkout
//! boundaries are exercised against [`OneShotServer`], a local axum
//! server that records a request and answers with a canned response.
//!
//! # Test Categories
//!
//! - `storefront_flow` - Catalog, filters and cart through the state object
//! - `checkout` - Checkout hand-off over HTTP
//! - `filter_properties` - Randomized filter invariants

use std::io;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use storefront::catalog::Catalog;
use storefront::presenter::{CartView, CheckoutControl, Notice, Presenter, ProductListing};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

// ============================================================================
// Presenter
// ============================================================================

/// Presenter that records every call.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub listings: Vec<ProductListing>,
    pub carts: Vec<CartView>,
    pub notices: Vec<Notice>,
    pub controls: Vec<CheckoutControl>,
    pub opened: Vec<Url>,
}

impl RecordingPresenter {
    /// Most recent listing render.
    #[must_use]
    pub fn last_listing(&self) -> Option<&ProductListing> {
        self.listings.last()
    }

    /// Most recent cart render.
    #[must_use]
    pub fn last_cart(&self) -> Option<&CartView> {
        self.carts.last()
    }
}

impl Presenter for RecordingPresenter {
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

// ============================================================================
// Catalog fixtures
// ============================================================================

/// Two-product catalog used by the cart and ingredient scenarios.
///
/// - `a`: 9.50, `jabones-aceite`, ingredients oliva + romero
/// - `b`: 4.00, `champus-solidos`, ingredients romero
pub const SCENARIO_CATALOG: &str = r#"[
    {"id": "a", "name": "Jabón de romero", "price": 9.5, "category": "jabones-aceite", "ingredients": ["oliva", "romero"], "image": "img/a.jpg"},
    {"id": "b", "name": "Champú de ortiga", "price": 4, "category": "champus-solidos", "ingredients": ["romero"], "image": "img/b.jpg"}
]"#;

/// A catalog written with the shop's original Spanish field names.
pub const SPANISH_CATALOG: &str = r#"[
    {"id": "jabon-lavanda", "nombre": "Jabón de lavanda", "precio": 6.5, "categoria": "jabones-glicerina", "aroma": "lavanda", "ingredientes": ["glicerina", "lavanda"], "imagen": "img/lavanda.jpg", "destacado": true, "descripcion_corta": "Suave y relajante"},
    {"id": "jabon-nardo", "nombre": "Ñora y nardo", "precio": 7, "categoria": "jabones-aceite", "aroma": "nardo", "ingredientes": ["oliva"], "imagen": "img/nardo.jpg"},
    {"id": "champu-ortiga", "nombre": "Champú de ortiga", "precio": 8.25, "categoria": "champus-solidos", "ingredientes": ["ortiga", "romero"], "imagen": "img/ortiga.jpg", "stock": false},
    {"id": "jabon-avena", "nombre": "avena", "precio": 5, "categoria": "jabones-aceite", "ingredientes": ["oliva", "avena"], "imagen": "img/avena.jpg"}
]"#;

/// Parse a fixture.
///
/// # Panics
///
/// Panics if the fixture is not a valid catalog.
#[must_use]
pub fn catalog(json: &str) -> Catalog {
    Catalog::from_json(json).expect("fixture catalog should parse")
}

// ============================================================================
// One-shot HTTP server
// ============================================================================

/// A request received by [`OneShotServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Canned answer shared with the fallback handler.
#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: Arc<str>,
    captured: Arc<Mutex<Option<oneshot::Sender<CapturedRequest>>>>,
}

/// Local HTTP server recording the first request it answers.
///
/// Every request gets the same canned status and JSON body.
pub struct OneShotServer {
    base: Url,
    captured: oneshot::Receiver<CapturedRequest>,
    server: JoinHandle<io::Result<()>>,
}

impl OneShotServer {
    /// Listen on an ephemeral port and answer with `status` and a JSON
    /// `body`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound or `status` is
    /// not a valid HTTP status code.
    pub async fn start(status: u16, body: impl Into<String>) -> io::Result<Self> {
        let status = StatusCode::from_u16(status).map_err(io::Error::other)?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base = Url::parse(&format!("http://{addr}/")).map_err(io::Error::other)?;

        let (sender, captured) = oneshot::channel();
        let canned = Canned {
            status,
            body: Arc::from(body.into()),
            captured: Arc::new(Mutex::new(Some(sender))),
        };
        let app = Router::new().fallback(answer).with_state(canned);

        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        Ok(Self {
            base,
            captured,
            server,
        })
    }

    /// URL of `path` on this server.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid relative URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("valid path")
    }

    /// Wait for the first request the server answered, then stop it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the server stopped before any request.
    pub async fn request(self) -> io::Result<CapturedRequest> {
        let request = self.captured.await.map_err(io::Error::other);
        self.server.abort();
        request
    }
}

async fn answer(
    State(canned): State<Canned>,
    method: Method,
    uri: Uri,
    body: String,
) -> impl IntoResponse {
    let sender = canned
        .captured
        .lock()
        .ok()
        .and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        // The receiver is gone once the test stopped waiting
        let _ = sender.send(CapturedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            body,
        });
    }

    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.to_string(),
    )
}
