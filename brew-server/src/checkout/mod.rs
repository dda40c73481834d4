//! Checkout: cart resolution, order creation and payment session setup

pub mod partner;
pub mod session;

pub use partner::{CheckoutPartner, HttpCheckoutPartner};
pub use session::{CartItem, CartToken, CheckoutInitiator, CheckoutSession};
