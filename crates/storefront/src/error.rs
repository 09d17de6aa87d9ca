//! Unified error handling with Sentry integration.
//!
//! Provides a `StorefrontError` umbrella over the per-module errors. Nothing
//! in the storefront is fatal: failures become a user notice via
//! [`StorefrontError::user_message`] and are reported via
//! [`StorefrontError::capture`].

use thiserror::Error;

use crate::catalog::CatalogLoadError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::presenter::{CART_NOT_SAVED, CATALOG_UNAVAILABLE, CHECKOUT_FAILED};
use crate::storage::{StorageReadError, StorageWriteError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog could not be fetched or parsed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogLoadError),

    /// Persisted cart could not be read.
    #[error("Storage read error: {0}")]
    StorageRead(#[from] StorageReadError),

    /// Cart could not be persisted.
    #[error("Storage write error: {0}")]
    StorageWrite(#[from] StorageWriteError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

impl StorefrontError {
    /// Message safe to show to shoppers. Internal details are never exposed.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Catalog(_) => CATALOG_UNAVAILABLE,
            Self::Checkout(_) => CHECKOUT_FAILED,
            Self::Config(_) => "La tienda no está configurada correctamente.",
            Self::StorageRead(_) | Self::StorageWrite(_) => CART_NOT_SAVED,
        }
    }

    /// Whether the error is worth reporting.
    ///
    /// Rejected checkouts (empty cart, already in flight) are user flow, not
    /// failures.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(
            self,
            Self::Checkout(CheckoutError::EmptyCart | CheckoutError::InFlight)
        )
    }

    /// Capture the error to Sentry and log it.
    pub fn capture(&self) {
        if !self.is_reportable() {
            tracing::debug!(error = %self, "Ignoring expected error");
            return;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Storefront error"
        );
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "jabon-romero")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
