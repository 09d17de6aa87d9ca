//! Catalog browsing commands.

use storefront::filter::FilterChange;
use storefront_core::ProductId;

use super::{CommandError, Context};

/// Print the product listing after applying `changes`.
pub async fn products(ctx: &mut Context, changes: Vec<FilterChange>) {
    ctx.load_catalog().await;
    for change in changes {
        ctx.storefront.on_filter_change(change);
    }
    ctx.storefront.presenter().print_listing();
}

/// Print the detail view of one product.
///
/// # Errors
///
/// Returns `CommandError::ProductNotFound` for an unknown id.
pub async fn show(ctx: &mut Context, id: &ProductId) -> Result<(), CommandError> {
    ctx.load_catalog().await;
    let detail = ctx
        .storefront
        .product_detail(id)
        .ok_or_else(|| CommandError::ProductNotFound(id.clone()))?;
    ctx.storefront.presenter().print_detail(&detail);
    Ok(())
}

/// Print the selectable filter values.
pub async fn facets(ctx: &mut Context) {
    ctx.load_catalog().await;
    let currency = ctx.storefront.currency();
    ctx.storefront
        .presenter()
        .print_facets(ctx.storefront.facets(), currency);
}
