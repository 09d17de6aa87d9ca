//! Terminal presenter.
//!
//! Notices and the checkout hand-off are printed as they happen. Listing and
//! cart renders only replace the current frame; commands print the frame
//! they care about once they are done.

#![allow(clippy::print_stdout)]

use std::fmt::Write as _;

use storefront::catalog::Facets;
use storefront::presenter::{
    CartView, CheckoutControl, Notice, NoticeLevel, Presenter, ProductCard, ProductDetail,
    ProductListing,
};
use storefront_core::CurrencyCode;
use url::Url;

/// Presenter writing to stdout.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    listing: Option<ProductListing>,
    cart: Option<CartView>,
}

impl Presenter for TerminalPresenter {
    fn render_products(&mut self, listing: &ProductListing) {
        self.listing = Some(listing.clone());
    }

    fn render_cart(&mut self, cart: &CartView) {
        self.cart = Some(cart.clone());
    }

    fn notify(&mut self, notice: Notice) {
        let marker = match notice.level {
            NoticeLevel::Success => "✓",
            NoticeLevel::Error => "✗",
        };
        println!("{marker} {}", notice.message);
    }

    fn set_checkout_control(&mut self, control: CheckoutControl) {
        tracing::debug!(label = control.label(), "Checkout control changed");
        if !control.is_enabled() {
            println!("{}", control.label());
        }
    }

    fn open_checkout(&mut self, url: &Url) {
        println!("Completa el pago en: {url}");
    }
}

impl TerminalPresenter {
    /// Print the last rendered listing.
    pub fn print_listing(&self) {
        let Some(listing) = &self.listing else {
            return;
        };
        println!("{}", format_listing(listing));
    }

    /// Print the last rendered cart.
    pub fn print_cart(&self) {
        let Some(cart) = &self.cart else {
            return;
        };
        println!("{}", format_cart(cart));
    }

    pub fn print_detail(&self, detail: &ProductDetail) {
        println!("{}", format_detail(detail));
    }

    pub fn print_facets(&self, facets: &Facets, currency: CurrencyCode) {
        println!("Categorías:");
        for category in &facets.categories {
            println!("  {:<20} {}", category.as_str(), category.label());
        }
        println!("Aromas: {}", facets.scents.join(", "));
        println!("Ingredientes: {}", facets.ingredients.join(", "));
        println!("Precio máximo: {}", facets.price_ceiling.display(currency));
    }
}

fn card_line(card: &ProductCard) -> String {
    let badge = card
        .badge
        .map(|b| format!("  [{}]", b.label()))
        .unwrap_or_default();
    format!(
        "  {:<24} {:<32} {:>10}{badge}",
        card.id.as_str(),
        card.name,
        card.price
    )
}

fn format_listing(listing: &ProductListing) -> String {
    if listing.is_empty() {
        return "No hay productos que coincidan con los filtros.".to_string();
    }
    let mut out = listing.count_label.clone();
    for card in &listing.cards {
        out.push('\n');
        out.push_str(&card_line(card));
    }
    out
}

fn format_cart(cart: &CartView) -> String {
    if cart.is_empty() {
        return "El carrito está vacío.".to_string();
    }
    let mut out = String::new();
    for item in &cart.items {
        let _ = writeln!(
            out,
            "  {:<24} {:<32} {:>3} x {:>10} = {:>10}",
            item.id.as_str(),
            item.name,
            item.quantity,
            item.price,
            item.line_price
        );
    }
    let _ = write!(out, "Artículos: {}  Subtotal: {}", cart.item_count, cart.subtotal);
    out
}

fn format_detail(detail: &ProductDetail) -> String {
    let card = &detail.card;
    let mut out = format!("{}\n{} · {}", card.name, card.category_label, card.scent_label);
    if let Some(badge) = card.badge {
        let _ = write!(out, " · {}", badge.label());
    }
    let _ = write!(out, "\n{}", card.price);
    if !card.description.is_empty() {
        let _ = write!(out, "\n\n{}", card.description);
    }
    if !detail.ingredients.is_empty() {
        let _ = write!(out, "\n\nIngredientes: {}", detail.ingredients.join(", "));
    }
    let _ = write!(out, "\n\n[{}]", detail.add_label());
    out
}
