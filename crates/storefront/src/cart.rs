//! Shopping cart and its persistent store.
//!
//! Per product id the cart is a small state machine:
//!
//! ```text
//! absent --add--> 1 --add / +1--> n --(-1 at 1) / remove--> absent
//! ```
//!
//! A line never holds quantity zero and there is at most one line per
//! product. [`CartStore`] wraps a [`Cart`] with a storage slot and persists
//! the whole line list after every mutation.

use serde::{Deserialize, Serialize};
use storefront_core::{Price, ProductId};
use tracing::{debug, warn};

use crate::catalog::{Catalog, Product};
use crate::storage::{KeyValueStore, StorageReadError, StorageWriteError};

/// A cart line with a snapshot of the product taken when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product the line refers to.
    #[serde(rename = "id", alias = "productId")]
    pub product_id: ProductId,
    /// Product name at add time.
    #[serde(alias = "nombre")]
    pub name: String,
    /// Unit price at add time.
    #[serde(alias = "precio")]
    pub price: Price,
    /// Product image at add time.
    #[serde(default, alias = "imagen")]
    pub image: String,
    /// Always at least 1.
    #[serde(alias = "cantidad")]
    pub quantity: u32,
}

impl CartLine {
    fn snapshot(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity: 1,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Persisted form of a line; tolerates out-of-range quantities so one bad
/// line does not discard the whole cart.
#[derive(Deserialize)]
struct StoredLine {
    #[serde(rename = "id", alias = "productId")]
    product_id: ProductId,
    #[serde(alias = "nombre")]
    name: String,
    #[serde(alias = "precio")]
    price: Price,
    #[serde(default, alias = "imagen")]
    image: Option<String>,
    #[serde(alias = "cantidad")]
    quantity: i64,
}

/// What a cart operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// Nothing happened (unknown product, sold out, missing line).
    Unchanged,
    /// A new line was created with quantity 1.
    Added,
    /// An existing line now has this quantity.
    Updated { quantity: u32 },
    /// The line is gone.
    Removed,
}

impl CartChange {
    /// Whether the cart contents changed.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// The in-memory cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, merging duplicate ids and dropping empty lines.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.line_mut(&line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    /// Parse the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the text is not a line list.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let stored: Vec<StoredLine> = serde_json::from_str(json)?;
        Ok(Self::from_lines(stored.into_iter().filter_map(|line| {
            let quantity = u32::try_from(line.quantity).ok()?;
            Some(CartLine {
                product_id: line.product_id,
                name: line.name,
                price: line.price,
                image: line.image.unwrap_or_default(),
                quantity,
            })
        })))
    }

    /// Serialize the line list.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.lines)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of a product. Sold-out products are ignored.
    pub fn add(&mut self, product: &Product) -> CartChange {
        if !product.is_available() {
            return CartChange::Unchanged;
        }
        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return CartChange::Updated {
                quantity: line.quantity,
            };
        }
        self.lines.push(CartLine::snapshot(product));
        CartChange::Added
    }

    /// Adjust a line's quantity; a result of zero or less removes the line.
    pub fn change_quantity(&mut self, product_id: &ProductId, delta: i64) -> CartChange {
        let Some(line) = self.line_mut(product_id) else {
            return CartChange::Unchanged;
        };
        let next = i64::from(line.quantity).saturating_add(delta);
        if next <= 0 {
            return self.remove(product_id);
        }
        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        CartChange::Updated {
            quantity: line.quantity,
        }
    }

    /// Remove a line if present.
    pub fn remove(&mut self, product_id: &ProductId) -> CartChange {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        if self.lines.len() == before {
            CartChange::Unchanged
        } else {
            CartChange::Removed
        }
    }

    /// Sum of quantities (the badge counter).
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

// =============================================================================
// CartStore
// =============================================================================

type CartListener = Box<dyn FnMut(&Cart) + Send>;

/// A cart bound to a persistent storage slot.
///
/// Every mutating call writes the full line list back to the slot and then
/// notifies registered listeners before returning.
///
/// Storage failures never undo a change: the in-memory cart stays
/// authoritative and the failure is kept until collected with
/// [`CartStore::take_read_error`] or [`CartStore::take_write_error`].
pub struct CartStore<S> {
    cart: Cart,
    storage: S,
    key: String,
    listeners: Vec<CartListener>,
    read_error: Option<StorageReadError>,
    write_error: Option<StorageWriteError>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Load the cart from `key` in `storage`.
    ///
    /// A missing, unreadable or corrupt slot yields an empty cart.
    pub fn load(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let (cart, read_error) = match read_cart(&storage, &key) {
            Ok(cart) => (cart, None),
            Err(e) => {
                warn!(error = %e, "Discarding persisted cart");
                (Cart::new(), Some(e))
            }
        };
        debug!(lines = cart.lines().len(), "Cart loaded");

        Self {
            cart,
            storage,
            key,
            listeners: Vec::new(),
            read_error,
            write_error: None,
        }
    }

    /// The failure that emptied the cart at load time, if any.
    pub const fn take_read_error(&mut self) -> Option<StorageReadError> {
        self.read_error.take()
    }

    /// The most recent failed write since the last call, if any.
    pub const fn take_write_error(&mut self) -> Option<StorageWriteError> {
        self.write_error.take()
    }

    /// Current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Storage slot name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Register a handler called after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&Cart) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Add one unit of a catalog product; unknown or sold-out ids are ignored.
    pub fn add(&mut self, catalog: &Catalog, product_id: &ProductId) -> CartChange {
        let change = catalog
            .get(product_id)
            .map_or(CartChange::Unchanged, |product| self.cart.add(product));
        self.commit(change)
    }

    /// See [`Cart::change_quantity`].
    pub fn change_quantity(&mut self, product_id: &ProductId, delta: i64) -> CartChange {
        let change = self.cart.change_quantity(product_id, delta);
        self.commit(change)
    }

    /// See [`Cart::remove`].
    pub fn remove(&mut self, product_id: &ProductId) -> CartChange {
        let change = self.cart.remove(product_id);
        self.commit(change)
    }

    fn commit(&mut self, change: CartChange) -> CartChange {
        if change.is_mutation() {
            if let Err(e) = self.persist() {
                tracing::error!(error = %e, "Failed to persist cart");
                self.write_error = Some(e);
            }
            for listener in &mut self.listeners {
                listener(&self.cart);
            }
        }
        change
    }

    fn persist(&mut self) -> Result<(), StorageWriteError> {
        let json = self.cart.to_json().map_err(|source| StorageWriteError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.storage.write(&self.key, &json)
    }
}

fn read_cart<S: KeyValueStore>(storage: &S, key: &str) -> Result<Cart, StorageReadError> {
    let Some(json) = storage.read(key)? else {
        return Ok(Cart::new());
    };
    Cart::from_json(&json).map_err(|source| StorageReadError::Corrupt {
        key: key.to_string(),
        source,
    })
}
