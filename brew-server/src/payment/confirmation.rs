//! Payment Confirmation Handler
//!
//! Two paths advance an order to `paid`:
//!
//! - **client confirmation** (`confirm`): the browser posts the gateway's
//!   `order_id|payment_id` signature after checkout;
//! - **gateway webhook** (`handle_webhook` → `reconcile`): the gateway calls
//!   back asynchronously, body signed with the webhook secret.
//!
//! Signatures are always checked before the ledger is touched. Duplicate
//! deliveries of an outcome already reflected by the order are no-ops.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderStatus, PaymentRefs};

use super::gateway::{PaymentGateway, SessionStatus};
use crate::ledger::{LedgerError, OrderLedger};
use crate::security_log;
use crate::signature::{SignatureError, verify_hex};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Outcome reported by the gateway for one order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid {
        payment_id: String,
        amount_minor: i64,
    },
    Cancelled,
}

/// `/orders/check-status` answer
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusView {
    #[serde(flatten)]
    pub session: SessionStatus,
    pub order_id: Option<String>,
    pub order_status: Option<OrderStatus>,
}

/// `/webhooks/payment` answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub event: String,
    pub order_id: Option<String>,
    /// The event changed ledger state
    pub applied: bool,
}

// ========== Webhook schema ==========

#[derive(Debug, Deserialize)]
struct PaymentWebhookEvent {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    payment: Option<Wrapped<PaymentEntity>>,
    #[serde(default)]
    order: Option<Wrapped<OrderEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct OrderEntity {
    id: String,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    receipt: Option<String>,
}

#[derive(Clone)]
pub struct PaymentConfirmation {
    ledger: OrderLedger,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    webhook_secret: String,
}

impl PaymentConfirmation {
    pub fn new(
        ledger: OrderLedger,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the client-relayed checkout signature and mark the order paid.
    ///
    /// `order_ref` is the gateway's order id (our session ref).
    pub fn confirm(&self, order_ref: &str, payment_ref: &str, signature: &str) -> AppResult<Order> {
        let message = format!("{order_ref}|{payment_ref}");
        if let Err(e) = verify_hex(&self.key_secret, message.as_bytes(), signature) {
            if e == SignatureError::MissingSecret {
                return Err(e.into());
            }
            security_log!(
                WARN,
                "payment_signature_rejected",
                session_ref = order_ref,
                payment_id = payment_ref
            );
            return Err(AppError::with_message(
                ErrorCode::PaymentSignatureInvalid,
                "Payment signature verification failed",
            ));
        }

        let order = self.ledger.find_by_session_ref(order_ref)?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("No order for payment session {order_ref}"),
            )
        })?;

        if order.status != OrderStatus::Created
            && order.payment.payment_id.as_deref() == Some(payment_ref)
        {
            return Ok(order);
        }

        let paid = self.ledger.mark_paid(
            &order.id,
            PaymentRefs {
                session_ref: None,
                payment_id: Some(payment_ref.to_string()),
                signature: Some(signature.to_string()),
            },
        )?;
        tracing::info!(order_id = %paid.id, payment_id = payment_ref, "Payment confirmed");
        Ok(paid)
    }

    /// Query the gateway for a session; never mutates the ledger
    pub async fn check_status(&self, session_ref: &str) -> AppResult<PaymentStatusView> {
        let session = self.gateway.fetch_session(session_ref).await?;
        let order = self.ledger.find_by_session_ref(session_ref)?;
        Ok(PaymentStatusView {
            session,
            order_id: order.as_ref().map(|o| o.id.clone()),
            order_status: order.map(|o| o.status),
        })
    }

    /// Apply a gateway-reported outcome to an order
    pub fn reconcile(&self, order_id: &str, outcome: PaymentOutcome) -> AppResult<Order> {
        let order = self.ledger.find_by_order_id(order_id)?;

        match outcome {
            PaymentOutcome::Paid {
                payment_id,
                amount_minor,
            } => {
                let expected = order.amount_minor();
                if expected != Some(amount_minor) {
                    tracing::warn!(
                        order_id,
                        expected = ?expected,
                        received = amount_minor,
                        "Payment amount mismatch"
                    );
                    return Err(AppError::with_message(
                        ErrorCode::PaymentAmountMismatch,
                        format!(
                            "Paid amount {amount_minor} does not match order amount {}",
                            order.amount
                        ),
                    ));
                }
                let refs = PaymentRefs {
                    session_ref: None,
                    payment_id: Some(payment_id),
                    signature: None,
                };
                self.apply_once(order_id, self.ledger.mark_paid(order_id, refs), |s| {
                    matches!(
                        s,
                        OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Delivered
                    )
                })
            }
            PaymentOutcome::Cancelled => self.apply_once(
                order_id,
                self.ledger
                    .mark_failed(order_id, Some("payment cancelled".to_string())),
                |s| s == OrderStatus::Failed,
            ),
        }
    }

    /// Treat a rejected transition as success when the order already shows it
    fn apply_once(
        &self,
        order_id: &str,
        result: Result<Order, LedgerError>,
        already_applied: impl Fn(OrderStatus) -> bool,
    ) -> AppResult<Order> {
        match result {
            Ok(order) => Ok(order),
            Err(LedgerError::InvalidTransition { from, .. }) if already_applied(from) => {
                tracing::info!(order_id, status = %from, "Duplicate payment outcome ignored");
                Ok(self.ledger.find_by_order_id(order_id)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify and apply a gateway webhook delivery.
    ///
    /// `order.paid` and `payment.captured` reconcile the order to paid;
    /// other events are acknowledged without effect.
    pub fn handle_webhook(&self, body: &[u8], signature: Option<&str>) -> AppResult<WebhookAck> {
        let signature = signature.ok_or_else(|| {
            security_log!(WARN, "payment_webhook_unsigned", reason = "missing signature");
            AppError::unauthorized()
        })?;
        if let Err(e) = verify_hex(&self.webhook_secret, body, signature) {
            security_log!(WARN, "payment_webhook_rejected", reason = %e);
            return Err(e.into());
        }

        let event: PaymentWebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Malformed payment event: {e}")))?;
        tracing::info!(event = %event.event, "Received payment webhook");

        let mut ack = WebhookAck {
            event: event.event.clone(),
            order_id: None,
            applied: false,
        };
        if !matches!(event.event.as_str(), "order.paid" | "payment.captured") {
            return Ok(ack);
        }

        let payment = event.payload.payment.map(|w| w.entity);
        let gateway_order = event.payload.order.map(|w| w.entity);

        let payment_id = payment
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or_else(|| AppError::validation("Payment event without payment entity"))?;
        let amount_minor = payment
            .as_ref()
            .map(|p| p.amount)
            .filter(|a| *a > 0)
            .or_else(|| gateway_order.as_ref().map(|o| o.amount_paid))
            .unwrap_or_default();
        let session_ref = gateway_order
            .as_ref()
            .map(|o| o.id.clone())
            .or_else(|| payment.as_ref().and_then(|p| p.order_id.clone()));

        let order = match gateway_order.as_ref().and_then(|o| o.receipt.as_deref()) {
            Some(receipt) => match self.ledger.find_by_order_id(receipt) {
                Ok(order) => Some(order),
                Err(LedgerError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        let order = match (order, session_ref) {
            (Some(order), _) => order,
            (None, Some(session_ref)) => self.ledger.find_by_session_ref(&session_ref)?.ok_or_else(
                || AppError::not_found(format!("Order for payment session {session_ref}")),
            )?,
            (None, None) => return Err(AppError::validation("Payment event without order reference")),
        };

        let before = order.version;
        let updated = self.reconcile(
            &order.id,
            PaymentOutcome::Paid {
                payment_id,
                amount_minor,
            },
        )?;
        ack.order_id = Some(updated.id.clone());
        ack.applied = updated.version != before;
        Ok(ack)
    }
}
