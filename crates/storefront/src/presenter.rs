//! Presentation bridge.
//!
//! The storefront never touches a rendering technology directly. After each
//! state transition it builds plain view models and hands them to a
//! [`Presenter`]. View models carry display-ready strings (formatted prices,
//! labels, badges) so presenters stay dumb.

use storefront_core::{CurrencyCode, Price, ProductId};
use url::Url;

use crate::cart::{Cart, CartLine};
use crate::catalog::Product;

/// Notice shown when the catalog cannot be loaded.
pub const CATALOG_UNAVAILABLE: &str = "No se pudieron cargar los productos. Recarga la página.";

/// Notice shown when a checkout attempt fails.
pub const CHECKOUT_FAILED: &str = "Error al procesar el pago. Inténtalo de nuevo.";

/// Notice shown when a cart change could not be saved on this device.
pub const CART_NOT_SAVED: &str = "No se pudo guardar el carrito en este dispositivo.";

/// Renders storefront state.
pub trait Presenter {
    /// Show the filtered product listing.
    fn render_products(&mut self, listing: &ProductListing);

    /// Show the cart contents and badge count.
    fn render_cart(&mut self, cart: &CartView);

    /// Show a transient notice.
    fn notify(&mut self, notice: Notice);

    /// Enable or disable the checkout control.
    fn set_checkout_control(&mut self, control: CheckoutControl);

    /// Navigate to the hosted payment page.
    fn open_checkout(&mut self, url: &Url);
}

// =============================================================================
// Notices
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A dismissible user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Confirmation after a product is added to the cart.
    #[must_use]
    pub fn added_to_cart(name: &str) -> Self {
        Self::success(format!("\"{name}\" añadido al carrito"))
    }
}

/// State of the checkout button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutControl {
    #[default]
    Enabled,
    /// A checkout request is in flight.
    Busy,
}

impl CheckoutControl {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enabled => "Finalizar compra",
            Self::Busy => "Redirigiendo…",
        }
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

// =============================================================================
// Product views
// =============================================================================

/// Card badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Featured,
    SoldOut,
}

impl Badge {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Featured => "Destacado",
            Self::SoldOut => "Agotado",
        }
    }
}

/// Product card display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub category_label: String,
    pub scent_label: String,
    pub description: String,
    pub price: String,
    pub image: String,
    pub badge: Option<Badge>,
    /// False for sold-out products; the add button is disabled.
    pub can_add: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        let sold_out = !product.is_available();
        let badge = if sold_out {
            Some(Badge::SoldOut)
        } else if product.featured {
            Some(Badge::Featured)
        } else {
            None
        };

        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            category_label: product.category.label().to_string(),
            scent_label: product
                .scent
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Sin aroma".to_string()),
            description: product.short_description.clone().unwrap_or_default(),
            price: product.price.display(currency),
            image: product.image.clone(),
            badge,
            can_add: !sold_out,
        }
    }
}

/// Product detail display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetail {
    pub card: ProductCard,
    pub ingredients: Vec<String>,
}

impl ProductDetail {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            card: ProductCard::new(product, currency),
            ingredients: product.ingredients.clone(),
        }
    }

    /// Label for the add button.
    #[must_use]
    pub const fn add_label(&self) -> &'static str {
        if self.card.can_add {
            "Añadir al carrito"
        } else {
            "Producto agotado"
        }
    }
}

/// The filtered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub cards: Vec<ProductCard>,
    /// "1 producto" / "N productos".
    pub count_label: String,
}

impl ProductListing {
    #[must_use]
    pub fn new(products: &[&Product], currency: CurrencyCode) -> Self {
        let count = products.len();
        Self {
            cards: products
                .iter()
                .map(|p| ProductCard::new(p, currency))
                .collect(),
            count_label: format!("{count} producto{}", if count == 1 { "" } else { "s" }),
        }
    }

    /// Nothing matched the filters; show the "no results" state instead of
    /// an empty grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// =============================================================================
// Cart views
// =============================================================================

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl CartLineView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            id: line.product_id.clone(),
            name: line.name.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            price: line.price.display(currency),
            line_price: line.line_total().display(currency),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, currency: CurrencyCode) -> Self {
        Self {
            items: cart
                .lines()
                .iter()
                .map(|l| CartLineView::new(l, currency))
                .collect(),
            subtotal: cart.subtotal().display(currency),
            item_count: cart.total_count(),
        }
    }

    /// Create an empty cart view.
    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::ZERO.display(currency),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
