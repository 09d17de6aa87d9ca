//! Combinable catalog filters.
//!
//! [`apply_filters`] is a pure function of the catalog and the current
//! [`FilterCriteria`]; it is re-run on every criteria change. Criteria only
//! change through [`FilterCriteria::apply`].
//!
//! Filters run in a fixed order: text, category, scent, ingredients, price,
//! stock, then sort. Category and scent selections are OR within the set;
//! ingredient selections are AND (a product must contain every selected
//! ingredient).

pub mod collation;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use storefront_core::Price;
use thiserror::Error;

use crate::catalog::{Category, Facets, Product};

pub use collation::CollationKey;

/// Error parsing a sort mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort mode: {0}")]
pub struct UnknownSortMode(pub String);

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Catalog order.
    #[default]
    Default,
    /// Cheapest first.
    #[serde(alias = "precio-asc")]
    PriceAsc,
    /// Most expensive first.
    #[serde(alias = "precio-desc")]
    PriceDesc,
    /// Alphabetical by name.
    #[serde(alias = "nombre")]
    Name,
}

impl SortMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Name => "name",
        }
    }
}

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "price-asc" | "precio-asc" => Ok(Self::PriceAsc),
            "price-desc" | "precio-desc" => Ok(Self::PriceDesc),
            "name" | "nombre" => Ok(Self::Name),
            other => Err(UnknownSortMode(other.to_string())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full set of active filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Trimmed search text; empty means no text filter.
    pub search: String,
    /// Selected categories; empty means all.
    pub categories: BTreeSet<Category>,
    /// Selected scents; empty means all.
    pub scents: BTreeSet<String>,
    /// Ingredients a product must all contain.
    pub ingredients: BTreeSet<String>,
    /// Inclusive price ceiling.
    pub max_price: Price,
    /// Hide products whose stock flag is explicitly false.
    pub in_stock_only: bool,
    /// Listing order.
    pub sort: SortMode,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: String::new(),
            categories: BTreeSet::new(),
            scents: BTreeSet::new(),
            ingredients: BTreeSet::new(),
            max_price: Price::MAX,
            in_stock_only: false,
            sort: SortMode::Default,
        }
    }
}

/// A single user change to the criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    /// Replace the search text.
    Search(String),
    /// Select or deselect a category.
    Category { category: Category, selected: bool },
    /// Select or deselect a scent.
    Scent { scent: String, selected: bool },
    /// Select or deselect a required ingredient.
    Ingredient { ingredient: String, selected: bool },
    /// Set the price ceiling.
    MaxPrice(Price),
    /// Toggle the in-stock-only filter.
    InStockOnly(bool),
    /// Change the listing order.
    Sort(SortMode),
    /// Clear everything and restore the price ceiling.
    Reset,
}

impl FilterCriteria {
    /// Default criteria for a catalog: nothing selected, price ceiling at
    /// the catalog maximum.
    #[must_use]
    pub fn for_facets(facets: &Facets) -> Self {
        Self {
            max_price: facets.price_ceiling,
            ..Self::default()
        }
    }

    /// Apply one change. `facets` supplies the ceiling restored by a reset.
    pub fn apply(&mut self, change: FilterChange, facets: &Facets) {
        match change {
            FilterChange::Search(text) => self.search = text.trim().to_string(),
            FilterChange::Category { category, selected } => {
                toggle(&mut self.categories, category, selected);
            }
            FilterChange::Scent { scent, selected } => toggle(&mut self.scents, scent, selected),
            FilterChange::Ingredient {
                ingredient,
                selected,
            } => toggle(&mut self.ingredients, ingredient, selected),
            FilterChange::MaxPrice(price) => self.max_price = price,
            FilterChange::InStockOnly(enabled) => self.in_stock_only = enabled,
            FilterChange::Sort(mode) => self.sort = mode,
            FilterChange::Reset => *self = Self::for_facets(facets),
        }
    }

    /// Whether a product passes every active predicate.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_text(product)
            && self.matches_category(product)
            && self.matches_scent(product)
            && self.matches_ingredients(product)
            && product.price <= self.max_price
            && (!self.in_stock_only || product.is_available())
    }

    fn matches_text(&self, product: &Product) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let query = self.search.to_lowercase();
        product.name.to_lowercase().contains(&query)
            || product
                .short_description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
            || product
                .ingredients
                .iter()
                .any(|i| i.to_lowercase().contains(&query))
    }

    fn matches_category(&self, product: &Product) -> bool {
        self.categories.is_empty() || self.categories.contains(&product.category)
    }

    fn matches_scent(&self, product: &Product) -> bool {
        self.scents.is_empty()
            || product
                .scent
                .as_ref()
                .is_some_and(|s| self.scents.contains(s))
    }

    fn matches_ingredients(&self, product: &Product) -> bool {
        self.ingredients.iter().all(|i| product.has_ingredient(i))
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T, selected: bool) {
    if selected {
        set.insert(value);
    } else {
        set.remove(&value);
    }
}

/// Filter and sort the catalog.
///
/// The result borrows from `products` and keeps catalog order for ties.
#[must_use]
pub fn apply_filters<'a>(products: &'a [Product], criteria: &FilterCriteria) -> Vec<&'a Product> {
    let mut result: Vec<&Product> = products.iter().filter(|p| criteria.matches(p)).collect();

    match criteria.sort {
        SortMode::Default => {}
        SortMode::PriceAsc => result.sort_by(|a, b| a.price.cmp(&b.price)),
        SortMode::PriceDesc => result.sort_by(|a, b| b.price.cmp(&a.price)),
        SortMode::Name => result.sort_by_cached_key(|p| CollationKey::new(&p.name)),
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"[
            {"id": "a", "name": "Romero y oliva", "price": 9.5, "category": "jabones-aceite",
             "scent": "romero", "ingredients": ["oliva", "romero"], "short_description": "Piel seca"},
            {"id": "b", "name": "Champú de ortiga", "price": 4, "category": "champus-solidos",
             "ingredients": ["romero"], "stock": false},
            {"id": "c", "name": "Árnica", "price": 6, "category": "jabones-glicerina",
             "scent": "lavanda", "ingredients": ["glicerina", "árnica"]},
            {"id": "d", "name": "Caléndula", "price": 4, "category": "jabones-aceite",
             "scent": "lavanda", "ingredients": ["oliva", "caléndula"]}
        ]"#,
        )
        .unwrap()
    }

    fn ids(result: &[&Product]) -> Vec<String> {
        result.iter().map(|p| p.id.to_string()).collect()
    }

    fn criteria_for(catalog: &Catalog) -> FilterCriteria {
        FilterCriteria::for_facets(&catalog.facets())
    }

    #[test]
    fn test_default_criteria_keep_everything_in_order() {
        let catalog = catalog();
        let result = apply_filters(catalog.products(), &criteria_for(&catalog));
        assert_eq!(ids(&result), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ingredients_are_and_not_or() {
        let catalog = catalog();
        let mut criteria = criteria_for(&catalog);
        criteria.ingredients = ["romero", "oliva"].iter().map(ToString::to_string).collect();

        let result = apply_filters(catalog.products(), &criteria);
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_text_matches_name_description_and_ingredients() {
        let catalog = catalog();
        let facets = catalog.facets();
        let mut criteria = criteria_for(&catalog);

        criteria.apply(FilterChange::Search("  ORTIGA ".to_string()), &facets);
        assert_eq!(criteria.search, "ORTIGA");
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["b"]);

        criteria.apply(FilterChange::Search("piel".to_string()), &facets);
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["a"]);

        criteria.apply(FilterChange::Search("glicerina".to_string()), &facets);
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["c"]);
    }

    #[test]
    fn test_category_and_scent_are_or_within_set() {
        let catalog = catalog();
        let facets = catalog.facets();
        let mut criteria = criteria_for(&catalog);

        for slug in ["jabones-aceite", "champus-solidos"] {
            criteria.apply(
                FilterChange::Category {
                    category: Category::new(slug),
                    selected: true,
                },
                &facets,
            );
        }
        assert_eq!(
            ids(&apply_filters(catalog.products(), &criteria)),
            vec!["a", "b", "d"]
        );

        criteria.apply(
            FilterChange::Scent {
                scent: "lavanda".to_string(),
                selected: true,
            },
            &facets,
        );
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["d"]);
    }

    #[test]
    fn test_price_is_inclusive_and_stock_filter() {
        let catalog = catalog();
        let facets = catalog.facets();
        let mut criteria = criteria_for(&catalog);

        criteria.apply(FilterChange::MaxPrice(Price::from_minor_units(400)), &facets);
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["b", "d"]);

        criteria.apply(FilterChange::InStockOnly(true), &facets);
        assert_eq!(ids(&apply_filters(catalog.products(), &criteria)), vec!["d"]);
    }

    #[test]
    fn test_sorting_is_stable() {
        let catalog = catalog();
        let facets = catalog.facets();
        let mut criteria = criteria_for(&catalog);

        criteria.apply(FilterChange::Sort(SortMode::PriceAsc), &facets);
        assert_eq!(
            ids(&apply_filters(catalog.products(), &criteria)),
            vec!["b", "d", "c", "a"]
        );

        criteria.apply(FilterChange::Sort(SortMode::PriceDesc), &facets);
        assert_eq!(
            ids(&apply_filters(catalog.products(), &criteria)),
            vec!["a", "c", "b", "d"]
        );

        criteria.apply(FilterChange::Sort(SortMode::Name), &facets);
        assert_eq!(
            ids(&apply_filters(catalog.products(), &criteria)),
            vec!["c", "d", "b", "a"]
        );
    }

    #[test]
    fn test_reset_restores_ceiling() {
        let catalog = catalog();
        let facets = catalog.facets();
        let mut criteria = criteria_for(&catalog);
        criteria.apply(FilterChange::MaxPrice(Price::ZERO), &facets);
        criteria.apply(FilterChange::InStockOnly(true), &facets);
        assert!(apply_filters(catalog.products(), &criteria).is_empty());

        criteria.apply(FilterChange::Reset, &facets);
        assert_eq!(criteria, criteria_for(&catalog));
        assert_eq!(criteria.max_price, facets.price_ceiling);
    }

    #[test]
    fn test_deselect_removes_from_set() {
        let facets = Facets::default();
        let mut criteria = FilterCriteria::default();
        let change = |selected| FilterChange::Ingredient {
            ingredient: "oliva".to_string(),
            selected,
        };
        criteria.apply(change(true), &facets);
        criteria.apply(change(true), &facets);
        assert_eq!(criteria.ingredients.len(), 1);
        criteria.apply(change(false), &facets);
        assert!(criteria.ingredients.is_empty());
    }

    #[test]
    fn test_sort_mode_names() {
        assert_eq!("precio-asc".parse::<SortMode>().unwrap(), SortMode::PriceAsc);
        assert_eq!("name".parse::<SortMode>().unwrap(), SortMode::Name);
        assert!("random".parse::<SortMode>().is_err());
        assert_eq!(SortMode::PriceDesc.to_string(), "price-desc");
    }
}
