//! Subcommand implementations.
//!
//! Every command builds a [`Context`] (file-backed cart plus terminal
//! presenter), drives the storefront entry points, and prints the result.

pub mod cart;
pub mod catalog;
pub mod checkout;

use storefront::Storefront;
use storefront::catalog::CatalogSource;
use storefront::config::{CheckoutConfig, StorefrontConfig};
use storefront::error::StorefrontError;
use storefront::storage::FileStore;
use storefront_core::{PriceError, ProductId};
use thiserror::Error;

use crate::presenter::TerminalPresenter;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No product with this id in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but cannot be added.
    #[error("Product is sold out: {0}")]
    SoldOut(ProductId),

    /// No cart line for this id.
    #[error("Product is not in the cart: {0}")]
    NotInCart(ProductId),

    /// Invalid price argument.
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storefront operation failed.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

/// Everything a command needs.
pub struct Context {
    pub storefront: Storefront<FileStore, TerminalPresenter>,
    client: reqwest::Client,
    catalog_source: CatalogSource,
    checkout: CheckoutConfig,
}

impl Context {
    /// Open the cart slot and prepare the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, CommandError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let storefront = Storefront::new(
            FileStore::new(&config.storage_dir),
            config.cart_key.clone(),
            TerminalPresenter::default(),
            config.currency,
        );

        Ok(Self {
            storefront,
            client,
            catalog_source: config.catalog_source.clone(),
            checkout: config.checkout.clone(),
        })
    }

    /// Fetch and install the catalog. Failures surface as a notice.
    pub async fn load_catalog(&mut self) {
        self.storefront
            .load_catalog(&self.client, &self.catalog_source)
            .await;
    }

    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub const fn checkout_config(&self) -> &CheckoutConfig {
        &self.checkout
    }
}
