//! Cart commands.
//!
//! The cart is persisted by the storefront after every change, so each
//! invocation picks up where the previous one left off.

use storefront::cart::CartChange;
use storefront_core::ProductId;

use super::{CommandError, Context};

/// Print the cart.
pub fn show(ctx: &Context) {
    ctx.storefront.presenter().print_cart();
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns `CommandError` if the product is unknown or sold out.
pub async fn add(ctx: &mut Context, id: &ProductId) -> Result<(), CommandError> {
    ctx.load_catalog().await;
    if ctx.storefront.on_add(id) == CartChange::Unchanged {
        return Err(match ctx.storefront.catalog().get(id) {
            Some(_) => CommandError::SoldOut(id.clone()),
            None => CommandError::ProductNotFound(id.clone()),
        });
    }
    ctx.storefront.presenter().print_cart();
    Ok(())
}

/// Change the quantity of a line.
///
/// # Errors
///
/// Returns `CommandError::NotInCart` if there is no line for `id`.
pub fn change_quantity(ctx: &mut Context, id: &ProductId, delta: i64) -> Result<(), CommandError> {
    if delta != 0 && ctx.storefront.on_quantity_change(id, delta) == CartChange::Unchanged {
        return Err(CommandError::NotInCart(id.clone()));
    }
    ctx.storefront.presenter().print_cart();
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns `CommandError::NotInCart` if there is no line for `id`.
pub fn remove(ctx: &mut Context, id: &ProductId) -> Result<(), CommandError> {
    if ctx.storefront.on_remove(id) == CartChange::Unchanged {
        return Err(CommandError::NotInCart(id.clone()));
    }
    ctx.storefront.presenter().print_cart();
    Ok(())
}
