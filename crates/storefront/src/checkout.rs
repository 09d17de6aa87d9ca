//! Hosted checkout hand-off.
//!
//! Checkout is a two-step exchange with external collaborators:
//!
//! 1. the cart is posted to a session-creation endpoint, which answers with
//!    an opaque session id;
//! 2. the session id is handed to the hosted payment page.
//!
//! Both boundaries are traits so the storefront can be driven without a
//! network. Nothing here mutates the cart; a failed checkout leaves it as it
//! was.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::{CheckoutSessionId, CurrencyCode, PriceError, ProductId};
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::cart::CartLine;

/// Placeholder replaced by the session id in redirect URL templates.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors from the session-creation endpoint.
#[derive(Debug, Error)]
pub enum CheckoutRequestError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Success status but no usable session id.
    #[error("invalid session response: {0}")]
    InvalidResponse(String),
}

/// Errors reported by the payment redirect.
#[derive(Debug, Error)]
#[error("payment redirect failed: {message}")]
pub struct CheckoutRedirectError {
    pub message: String,
}

/// Everything that can stop a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to pay for; no request was made.
    #[error("cart is empty")]
    EmptyCart,

    /// A checkout is already waiting on the network.
    #[error("a checkout is already in progress")]
    InFlight,

    /// A line's price cannot be expressed in minor units.
    #[error("invalid price for {product_id}: {source}")]
    InvalidLine {
        product_id: ProductId,
        #[source]
        source: PriceError,
    },

    /// Session creation failed.
    #[error(transparent)]
    Request(#[from] CheckoutRequestError),

    /// The payment page could not be opened.
    #[error(transparent)]
    Redirect(#[from] CheckoutRedirectError),
}

// =============================================================================
// Wire types
// =============================================================================

/// One line of a session-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price in minor currency units.
    pub unit_price: i64,
    pub quantity: u32,
    pub image: String,
}

/// Session-creation request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub line_items: Vec<LineItemRequest>,
    pub currency: CurrencyCode,
}

impl CheckoutRequest {
    /// Convert cart lines into a request.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for no lines and
    /// `CheckoutError::InvalidLine` if a price overflows minor units.
    pub fn from_lines(lines: &[CartLine], currency: CurrencyCode) -> Result<Self, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let line_items = lines
            .iter()
            .map(|line| {
                let unit_price = line.price.to_minor_units(currency).map_err(|source| {
                    CheckoutError::InvalidLine {
                        product_id: line.product_id.clone(),
                        source,
                    }
                })?;
                Ok(LineItemRequest {
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    unit_price,
                    quantity: line.quantity,
                    image: line.image.clone(),
                })
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;

        Ok(Self {
            line_items,
            currency,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// =============================================================================
// Boundaries
// =============================================================================

/// Creates hosted checkout sessions.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Submit the request and return the session id.
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSessionId, CheckoutRequestError>;
}

/// Hands a session over to the hosted payment page.
#[async_trait]
pub trait PaymentRedirect: Send + Sync {
    /// Start the redirect and return the page being opened.
    async fn redirect(&self, session_id: &CheckoutSessionId) -> Result<Url, CheckoutRedirectError>;
}

/// Session-creation endpoint reached over HTTP.
#[derive(Clone)]
pub struct HttpCheckoutGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCheckoutGateway {
    /// Create a gateway posting to `endpoint`.
    #[must_use]
    pub const fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint, lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSessionId, CheckoutRequestError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        // Non-2xx is a failure whatever the body says
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| format!("server error ({})", status.as_u16()));
            return Err(CheckoutRequestError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| CheckoutRequestError::InvalidResponse(e.to_string()))?;
        if session.session_id.is_empty() {
            return Err(CheckoutRequestError::InvalidResponse(
                "empty session id".to_string(),
            ));
        }

        debug!("Checkout session created");
        Ok(CheckoutSessionId::new(session.session_id))
    }
}

/// Redirect to a hosted payment page built from a URL template.
#[derive(Debug, Clone)]
pub struct HostedRedirect {
    template: String,
}

impl HostedRedirect {
    /// `template` must contain [`SESSION_ID_PLACEHOLDER`].
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The payment page URL for a session.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutRedirectError` if the template lacks the placeholder,
    /// the session id holds characters outside `[A-Za-z0-9_-]`, or the
    /// result is not a valid URL.
    pub fn checkout_url(&self, session_id: &CheckoutSessionId) -> Result<Url, CheckoutRedirectError> {
        if !self.template.contains(SESSION_ID_PLACEHOLDER) {
            return Err(CheckoutRedirectError {
                message: format!("redirect template has no {SESSION_ID_PLACEHOLDER}"),
            });
        }
        // The id lands verbatim in the URL and must not reshape it
        if !is_url_safe_session_id(session_id.as_str()) {
            return Err(CheckoutRedirectError {
                message: format!("session id {:?} is not URL-safe", session_id.as_str()),
            });
        }
        let url = self.template.replace(SESSION_ID_PLACEHOLDER, session_id.as_str());
        Url::parse(&url).map_err(|e| CheckoutRedirectError {
            message: format!("invalid redirect URL: {e}"),
        })
    }
}

fn is_url_safe_session_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl PaymentRedirect for HostedRedirect {
    async fn redirect(&self, session_id: &CheckoutSessionId) -> Result<Url, CheckoutRedirectError> {
        let url = self.checkout_url(session_id)?;
        info!(%url, "Redirecting to hosted checkout");
        Ok(url)
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// A successful hand-off to the payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutHandoff {
    pub session_id: CheckoutSessionId,
    pub url: Url,
}

/// Run a checkout for the given lines.
///
/// An empty cart fails before any network call.
///
/// # Errors
///
/// Returns `CheckoutError` if the cart is empty, a price cannot be
/// converted, session creation fails, or the redirect fails.
pub async fn initiate_checkout(
    lines: &[CartLine],
    currency: CurrencyCode,
    gateway: &dyn CheckoutGateway,
    redirect: &dyn PaymentRedirect,
) -> Result<CheckoutHandoff, CheckoutError> {
    let request = CheckoutRequest::from_lines(lines, currency)?;
    let session_id = gateway.create_session(&request).await?;
    let url = redirect.redirect(&session_id).await?;
    Ok(CheckoutHandoff { session_id, url })
}
