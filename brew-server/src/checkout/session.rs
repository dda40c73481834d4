//! Checkout Session Initiator
//!
//! Turns a cart into a `created` order plus a payment session. Prices come
//! from the catalog only; any price or total the client sends is ignored.
//!
//! The order is persisted before the payment gateway is called. If the
//! gateway fails the order stays `created` with no session attached.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use shared::models::{CustomerSnapshot, OrderItem};
use shared::util::now_millis;

use super::partner::{CartLine, CartTokenRequest, CheckoutPartner};
use crate::catalog::{CatalogStore, ResolvedItem};
use crate::ledger::{NewOrder, OrderLedger};
use crate::payment::{PaymentGateway, SessionRequest};

/// One cart line as submitted by the storefront
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    /// Product id or variant id
    #[serde(alias = "id", alias = "product_id")]
    pub variant_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub order_id: String,
    /// Payment gateway order id
    pub session_ref: String,
    pub amount: Decimal,
    pub amount_minor: i64,
    pub currency: String,
    /// Public key for the browser checkout widget
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartToken {
    pub success: bool,
    pub token: String,
}

#[derive(Clone)]
pub struct CheckoutInitiator {
    catalog: CatalogStore,
    ledger: OrderLedger,
    gateway: Arc<dyn PaymentGateway>,
    partner: Arc<dyn CheckoutPartner>,
    currency: String,
}

fn validate_items(items: &[CartItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }
    for item in items {
        if item.variant_id.trim().is_empty() {
            return Err(AppError::validation("Cart item without id"));
        }
        if item.quantity == 0 {
            return Err(AppError::validation(format!(
                "Quantity for {} must be at least 1",
                item.variant_id
            )));
        }
    }
    Ok(())
}

fn validate_customer(customer: &CustomerSnapshot) -> AppResult<()> {
    let missing = [
        ("name", customer.name.trim()),
        ("email", customer.email.trim()),
        ("postcode", customer.address.postcode.trim()),
    ]
    .into_iter()
    .find(|(_, v)| v.is_empty());
    if let Some((field, _)) = missing {
        return Err(AppError::validation(format!("Customer {field} is required"))
            .with_detail("field", field));
    }
    if !customer.email.contains('@') {
        return Err(AppError::validation("Customer email is invalid").with_detail("field", "email"));
    }
    Ok(())
}

impl CheckoutInitiator {
    pub fn new(
        catalog: CatalogStore,
        ledger: OrderLedger,
        gateway: Arc<dyn PaymentGateway>,
        partner: Arc<dyn CheckoutPartner>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            gateway,
            partner,
            currency: currency.into(),
        }
    }

    fn resolve_all<'a>(
        &self,
        items: &'a [CartItem],
    ) -> AppResult<Vec<(ResolvedItem, &'a CartItem)>> {
        items
            .iter()
            .map(|item| Ok((self.catalog.resolve_sellable(item.variant_id.trim())?, item)))
            .collect()
    }

    /// Create the order and open a payment session for it
    pub async fn create_session(
        &self,
        items: Vec<CartItem>,
        customer: CustomerSnapshot,
        pickup_region: Option<String>,
    ) -> AppResult<CheckoutSession> {
        validate_items(&items)?;
        validate_customer(&customer)?;

        let lines = self
            .resolve_all(&items)?
            .into_iter()
            .map(|(resolved, cart)| OrderItem {
                product_id: resolved.product.id.clone(),
                variant_id: resolved.variant.as_ref().map(|v| v.id.clone()),
                name: resolved.display_name(),
                sku: resolved.sku(),
                quantity: cart.quantity,
                unit_price: resolved.unit_price(),
            })
            .collect();

        let order = self.ledger.create_order(NewOrder {
            customer,
            items: lines,
            pickup_region: pickup_region.filter(|p| !p.trim().is_empty()),
            currency: self.currency.clone(),
        })?;
        let amount_minor = order
            .amount_minor()
            .ok_or_else(|| AppError::validation("Order total is too large"))?;

        let session = self
            .gateway
            .create_session(SessionRequest {
                amount_minor,
                currency: order.currency.clone(),
                receipt: order.id.clone(),
            })
            .await
            .inspect_err(|e| {
                tracing::warn!(order_id = %order.id, error = %e, "Payment session failed, order left created");
            })?;

        self.ledger.attach_session(&order.id, &session.session_ref)?;
        tracing::info!(
            order_id = %order.id,
            session_ref = %session.session_ref,
            amount = %order.amount,
            "Checkout session created"
        );

        Ok(CheckoutSession {
            order_id: order.id.clone(),
            session_ref: session.session_ref,
            amount: order.amount,
            amount_minor,
            currency: order.currency,
            key_id: self.gateway.public_key().to_string(),
        })
    }

    /// Mint a checkout-partner cart token for items that are all sellable
    pub async fn generate_cart_token(
        &self,
        items: Vec<CartItem>,
        redirect_url: Option<String>,
    ) -> AppResult<CartToken> {
        validate_items(&items)?;
        let lines = self
            .resolve_all(&items)?
            .into_iter()
            .map(|(resolved, cart)| CartLine {
                variant_id: resolved
                    .variant
                    .as_ref()
                    .map_or_else(|| resolved.product.id.clone(), |v| v.id.clone()),
                quantity: cart.quantity,
            })
            .collect();

        let token = self
            .partner
            .create_cart_token(CartTokenRequest {
                items: lines,
                redirect_url,
                timestamp: now_millis(),
            })
            .await?;
        Ok(CartToken {
            success: true,
            token,
        })
    }
}
