//! Status enums for catalog entities.

use serde::{Deserialize, Serialize};

/// Stock status of a product.
///
/// Catalog records carry an optional boolean stock flag. Only an explicit
/// `false` marks a product as sold out; a missing flag means in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    SoldOut,
}

impl StockStatus {
    /// Derive the status from a raw catalog stock flag.
    #[must_use]
    pub const fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(false) => Self::SoldOut,
            Some(true) | None => Self::InStock,
        }
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::InStock)
    }
}
