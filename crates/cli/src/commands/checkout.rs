//! Hosted checkout command.

use storefront::checkout::{CheckoutError, HostedRedirect, HttpCheckoutGateway};
use storefront::error::StorefrontError;

use super::{CommandError, Context};

/// Create a checkout session and print the payment page URL.
///
/// An empty cart is reported and is not an error.
///
/// # Errors
///
/// Returns `CommandError::Storefront` if the checkout fails. The shopper
/// has already been shown a notice and the cart is unchanged.
pub async fn run(ctx: &mut Context) -> Result<(), CommandError> {
    let config = ctx.checkout_config();
    let gateway = HttpCheckoutGateway::new(ctx.client().clone(), config.session_url.clone());
    let redirect = HostedRedirect::new(config.redirect_template.clone());

    match ctx.storefront.on_checkout(&gateway, &redirect).await {
        Ok(_) => Ok(()),
        Err(StorefrontError::Checkout(CheckoutError::EmptyCart)) => {
            ctx.storefront.presenter().print_cart();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
