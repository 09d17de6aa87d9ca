//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_CATALOG_SOURCE` - Catalog URL or file path (default: products.json)
//! - `STOREFRONT_CHECKOUT_SESSION_URL` - Session-creation endpoint
//!   (default: <http://127.0.0.1:8888/.netlify/functions/create-checkout-session>)
//! - `STOREFRONT_CHECKOUT_REDIRECT_URL` - Hosted payment page template containing
//!   `{CHECKOUT_SESSION_ID}` (default: <https://checkout.stripe.com/pay/{CHECKOUT_SESSION_ID}>)
//! - `STOREFRONT_CURRENCY` - ISO currency code (default: EUR)
//! - `STOREFRONT_CART_KEY` - Storage slot for the cart (default: `esencia_romero_cart_v1`)
//! - `STOREFRONT_STORAGE_DIR` - Directory for file-backed slots (default: .storefront)
//! - `SENTRY_DSN` - Sentry error tracking DSN (placeholder values rejected)
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use storefront_core::CurrencyCode;
use thiserror::Error;
use url::Url;

use crate::catalog::CatalogSource;
use crate::checkout::SESSION_ID_PLACEHOLDER;

const DEFAULT_CATALOG_SOURCE: &str = "products.json";
const DEFAULT_SESSION_URL: &str =
    "http://127.0.0.1:8888/.netlify/functions/create-checkout-session";
const DEFAULT_REDIRECT_URL: &str = "https://checkout.stripe.com/pay/{CHECKOUT_SESSION_ID}";
const DEFAULT_CART_KEY: &str = "esencia_romero_cart_v1";
const DEFAULT_STORAGE_DIR: &str = ".storefront";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Placeholder value in {0}: {1}")]
    Placeholder(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Where the catalog is loaded from
    pub catalog_source: CatalogSource,
    /// Checkout boundary configuration
    pub checkout: CheckoutConfig,
    /// Currency for display and checkout
    pub currency: CurrencyCode,
    /// Storage slot holding the cart
    pub cart_key: String,
    /// Directory for file-backed storage slots
    pub storage_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Checkout boundary configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Session-creation endpoint
    pub session_url: Url,
    /// Payment page template containing the session id placeholder
    pub redirect_template: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or holds a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or holds a placeholder.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let catalog_source = get_env_or_default(&env, "STOREFRONT_CATALOG_SOURCE", DEFAULT_CATALOG_SOURCE)
            .parse::<CatalogSource>()
            .map_err(|e| invalid("STOREFRONT_CATALOG_SOURCE", e))?;
        let currency = get_env_or_default(&env, "STOREFRONT_CURRENCY", "EUR")
            .parse::<CurrencyCode>()
            .map_err(|e| invalid("STOREFRONT_CURRENCY", e))?;
        let cart_key = get_env_or_default(&env, "STOREFRONT_CART_KEY", DEFAULT_CART_KEY);

        let sentry_dsn = get_optional_env(&env, "SENTRY_DSN");
        if let Some(dsn) = &sentry_dsn {
            reject_placeholder(dsn, "SENTRY_DSN")?;
        }

        Ok(Self {
            catalog_source,
            checkout: CheckoutConfig::from_lookup(&env)?,
            currency,
            cart_key,
            storage_dir: PathBuf::from(get_env_or_default(
                &env,
                "STOREFRONT_STORAGE_DIR",
                DEFAULT_STORAGE_DIR,
            )),
            sentry_dsn,
            sentry_environment: get_optional_env(&env, "SENTRY_ENVIRONMENT"),
        })
    }
}

impl CheckoutConfig {
    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let session_url = get_env_or_default(env, "STOREFRONT_CHECKOUT_SESSION_URL", DEFAULT_SESSION_URL);
        let session_url = parse_http_url("STOREFRONT_CHECKOUT_SESSION_URL", &session_url)?;

        let redirect_template =
            get_env_or_default(env, "STOREFRONT_CHECKOUT_REDIRECT_URL", DEFAULT_REDIRECT_URL);
        validate_redirect_template("STOREFRONT_CHECKOUT_REDIRECT_URL", &redirect_template)?;

        Ok(Self {
            session_url,
            redirect_template,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable; empty values count as unset.
fn get_optional_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(env: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

/// Parse an absolute http(s) URL.
fn parse_http_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(key, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(key, format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}

/// A redirect template must contain the placeholder and form a valid URL
/// once it is substituted.
fn validate_redirect_template(key: &str, template: &str) -> Result<(), ConfigError> {
    if !template.contains(SESSION_ID_PLACEHOLDER) {
        return Err(invalid(key, format!("missing {SESSION_ID_PLACEHOLDER}")));
    }
    parse_http_url(key, &template.replace(SESSION_ID_PLACEHOLDER, "cs_test"))?;
    Ok(())
}

/// Reject values that look like unfilled template text.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::Placeholder(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(
            config.catalog_source,
            CatalogSource::File(PathBuf::from("products.json"))
        );
        assert_eq!(config.currency, CurrencyCode::EUR);
        assert_eq!(config.cart_key, "esencia_romero_cart_v1");
        assert_eq!(config.storage_dir, PathBuf::from(".storefront"));
        assert_eq!(
            config.checkout.session_url.as_str(),
            "http://127.0.0.1:8888/.netlify/functions/create-checkout-session"
        );
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_remote_catalog_and_currency() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_CATALOG_SOURCE", "https://shop.test/products.json"),
            ("STOREFRONT_CURRENCY", "gbp"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]))
        .unwrap();

        assert!(matches!(config.catalog_source, CatalogSource::Remote(_)));
        assert_eq!(config.currency, CurrencyCode::GBP);
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_invalid_session_url() {
        let result = StorefrontConfig::from_lookup(lookup(&[(
            "STOREFRONT_CHECKOUT_SESSION_URL",
            "not a url",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_CHECKOUT_SESSION_URL"));
    }

    #[test]
    fn test_redirect_template_requires_placeholder() {
        let result = StorefrontConfig::from_lookup(lookup(&[(
            "STOREFRONT_CHECKOUT_REDIRECT_URL",
            "https://checkout.stripe.com/pay",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_unknown_currency() {
        let result = StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_CURRENCY", "XYZ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_placeholder() {
        assert!(reject_placeholder("pk_test_your_key_here", "TEST_VAR").is_err());
        assert!(reject_placeholder("REPLACE_ME", "TEST_VAR").is_err());
        assert!(reject_placeholder("pk_live_51HxQa2LkT9", "TEST_VAR").is_ok());

        let result = StorefrontConfig::from_lookup(lookup(&[(
            "SENTRY_DSN",
            "https://your-key@o0.ingest.sentry.io/0",
        )]));
        assert!(matches!(result, Err(ConfigError::Placeholder(key, _)) if key == "SENTRY_DSN"));

        let config = StorefrontConfig::from_lookup(lookup(&[(
            "SENTRY_DSN",
            "https://4f9a1c@o4507.ingest.sentry.io/451",
        )]))
        .unwrap();
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config =
            StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_CART_KEY", "  ")])).unwrap();
        assert_eq!(config.cart_key, "esencia_romero_cart_v1");
    }
}
