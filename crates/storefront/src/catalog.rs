//! Product catalog loading.
//!
//! The catalog is a static JSON array of product records, fetched once per
//! start-up from either an HTTP(S) URL or a local file. There is no retry
//! and no cache: a failed load yields an error the caller turns into an empty
//! catalog plus a user-visible notice.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use storefront_core::{Price, ProductId, StockStatus};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Lower bound for the price filter ceiling, so the price slider always has
/// some range even for a catalog of cheap products.
pub const MIN_PRICE_CEILING: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog server answered with a non-success status.
    #[error("catalog source returned HTTP {0}")]
    Status(u16),

    /// Local catalog file could not be read.
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// Product Types
// =============================================================================

/// Product category slug (e.g., `jabones-aceite`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Create a category from its slug.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// The raw slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label; unknown slugs display as-is.
    #[must_use]
    pub fn label(&self) -> &str {
        match self.0.as_str() {
            "jabones-aceite" => "Jabones de aceite",
            "jabones-glicerina" => "Jabones de glicerina",
            "champus-solidos" => "Champús sólidos",
            other => other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

/// A product in the store.
///
/// Field names follow the catalog JSON; the shop's original Spanish names
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Display name.
    #[serde(alias = "nombre")]
    pub name: String,
    /// Unit price.
    #[serde(alias = "precio")]
    pub price: Price,
    /// Category slug.
    #[serde(alias = "categoria")]
    pub category: Category,
    /// Scent, if the product has one.
    #[serde(default, alias = "aroma", skip_serializing_if = "Option::is_none")]
    pub scent: Option<String>,
    /// Ingredient names, in display order.
    #[serde(default, alias = "ingredientes", deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    /// Image URL or path.
    #[serde(default, alias = "imagen", deserialize_with = "null_as_default")]
    pub image: String,
    /// Raw stock flag; see [`Product::stock_status`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<bool>,
    /// Whether the product is highlighted in listings.
    #[serde(default, alias = "destacado", deserialize_with = "null_as_default")]
    pub featured: bool,
    /// One-line description.
    #[serde(default, alias = "descripcion_corta", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

impl Product {
    /// Stock status derived from the raw flag.
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_flag(self.stock)
    }

    /// Whether the product can be added to the cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock_status().is_available()
    }

    /// Whether the product lists the given ingredient.
    #[must_use]
    pub fn has_ingredient(&self, ingredient: &str) -> bool {
        self.ingredients.iter().any(|i| i == ingredient)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Catalog
// =============================================================================

/// The loaded product collection, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Wrap a list of products.
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// An empty catalog (used after a failed load).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Parse a catalog from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError::Parse` if the JSON is not a product list.
    pub fn from_json(json: &str) -> Result<Self, CatalogLoadError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id. The first match wins if ids repeat.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Filter options derived from the catalog contents.
    #[must_use]
    pub fn facets(&self) -> Facets {
        let mut categories: Vec<Category> = Vec::new();
        for product in &self.products {
            if !categories.contains(&product.category) {
                categories.push(product.category.clone());
            }
        }

        let scents: BTreeSet<&str> = self
            .products
            .iter()
            .filter_map(|p| p.scent.as_deref())
            .filter(|s| !s.is_empty())
            .collect();

        let ingredients: BTreeSet<&str> = self
            .products
            .iter()
            .flat_map(|p| p.ingredients.iter().map(String::as_str))
            .collect();

        let max_price = self
            .products
            .iter()
            .map(|p| p.price.amount())
            .max()
            .unwrap_or(Decimal::ZERO);

        Facets {
            categories,
            scents: scents.into_iter().map(str::to_owned).collect(),
            ingredients: ingredients.into_iter().map(str::to_owned).collect(),
            price_ceiling: Price::new(max_price.max(MIN_PRICE_CEILING)).unwrap_or(Price::ZERO),
        }
    }
}

/// Selectable filter values for a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facets {
    /// Categories in order of first appearance.
    pub categories: Vec<Category>,
    /// Distinct scents, sorted.
    pub scents: Vec<String>,
    /// Distinct ingredients, sorted.
    pub ingredients: Vec<String>,
    /// Upper bound for the price filter.
    pub price_ceiling: Price,
}

impl Default for Facets {
    fn default() -> Self {
        Catalog::empty().facets()
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Where the catalog is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Remote JSON document.
    Remote(Url),
    /// Local JSON file.
    File(PathBuf),
}

impl FromStr for CatalogSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            _ => Ok(Self::File(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch the catalog once from its source.
///
/// # Errors
///
/// Returns `CatalogLoadError` on transport failure, a non-success HTTP
/// status, an unreadable file, or malformed JSON.
#[instrument(skip(client), fields(source = %source))]
pub async fn load_catalog(
    client: &reqwest::Client,
    source: &CatalogSource,
) -> Result<Catalog, CatalogLoadError> {
    let body = match source {
        CatalogSource::Remote(url) => {
            let response = client.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(CatalogLoadError::Status(status.as_u16()));
            }
            response.text().await?
        }
        CatalogSource::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CatalogLoadError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    let catalog = Catalog::from_json(&body)?;
    debug!(count = catalog.len(), "Catalog loaded");
    Ok(catalog)
}
