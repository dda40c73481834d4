//! Order Ledger
//!
//! The only component that mutates orders. Every mutation is a
//! lookup-then-conditional-update by order id performed inside one redb
//! write transaction, so two concurrent deliveries of the same webhook can
//! never both pass the same precondition.
//!
//! Each successful mutation bumps `Order::version`; status changes are also
//! appended to `Order::history`.

pub mod transition;

pub use transition::{OrderEvent, next_status};

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CustomerSnapshot, Order, OrderItem, OrderStatus, PaymentRefs, ShipmentRefs, StatusChange,
    to_minor_units,
};
use shared::util::{new_order_id, now_millis};
use shared::{PageQuery, PaginatedResponse};
use thiserror::Error;

use crate::store::{DocumentStore, ORDERS, StoreError, Write};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Order {0} not found")]
    NotFound(String),

    #[error("Order {order_id} cannot go from {from} on {event}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        event: OrderEvent,
    },

    #[error("Order {order_id} is {status}: {reason}")]
    Precondition {
        order_id: String,
        status: OrderStatus,
        reason: &'static str,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Order {0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(id) => LedgerError::AlreadyExists(id),
            other => LedgerError::Store(other),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(ref id) => {
                AppError::with_message(ErrorCode::OrderNotFound, e.to_string())
                    .with_detail("order_id", id.clone())
            }
            LedgerError::InvalidTransition {
                ref order_id,
                from,
                event,
            } => AppError::with_message(ErrorCode::OrderInvalidTransition, e.to_string())
                .with_detail("order_id", order_id.clone())
                .with_detail("from", from.as_str())
                .with_detail("event", event.as_str()),
            LedgerError::Precondition { status, .. } => {
                AppError::precondition(e.to_string()).with_detail("status", status.as_str())
            }
            LedgerError::Validation(msg) => AppError::validation(msg),
            LedgerError::AlreadyExists(id) => AppError::already_exists(id),
            LedgerError::Store(err) => err.into(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Input for [`OrderLedger::create_order`]
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    pub pickup_region: Option<String>,
    pub currency: String,
}

#[derive(Clone)]
pub struct OrderLedger {
    store: DocumentStore,
}

impl OrderLedger {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new order in `created`.
    ///
    /// The amount is always recomputed from the lines; uniqueness of the id
    /// is enforced by the store's unique key.
    pub fn create_order(&self, new: NewOrder) -> LedgerResult<Order> {
        if new.items.is_empty() {
            return Err(LedgerError::Validation(
                "Order must contain at least one item".into(),
            ));
        }
        if let Some(item) = new.items.iter().find(|i| i.quantity == 0) {
            return Err(LedgerError::Validation(format!(
                "Quantity for {} must be at least 1",
                item.product_id
            )));
        }
        if let Some(item) = new.items.iter().find(|i| i.unit_price < Decimal::ZERO) {
            return Err(LedgerError::Validation(format!(
                "Unit price for {} must not be negative",
                item.product_id
            )));
        }

        let now = now_millis();
        let mut order = Order {
            id: new_order_id(),
            amount: Decimal::ZERO,
            currency: new.currency,
            status: OrderStatus::Created,
            customer: new.customer,
            items: new.items,
            pickup_region: new.pickup_region,
            payment: PaymentRefs::default(),
            shipment: ShipmentRefs::default(),
            history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        order.amount = order
            .items_total()
            .filter(|total| to_minor_units(*total).is_some())
            .ok_or_else(|| LedgerError::Validation("Order total is too large".into()))?;

        self.store.insert_new(ORDERS, &order.id, &order)?;
        tracing::info!(
            order_id = %order.id,
            amount = %order.amount,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }

    pub fn find_by_order_id(&self, order_id: &str) -> LedgerResult<Order> {
        self.store
            .get(ORDERS, order_id)?
            .ok_or_else(|| LedgerError::NotFound(order_id.to_string()))
    }

    /// Order whose payment session (collaborator order id) is `session_ref`
    pub fn find_by_session_ref(&self, session_ref: &str) -> LedgerResult<Option<Order>> {
        Ok(self.store.find_where(ORDERS, |o: &Order| {
            o.payment.session_ref.as_deref() == Some(session_ref)
        })?)
    }

    pub fn find_by_shipment_id(&self, shipment_id: &str) -> LedgerResult<Option<Order>> {
        Ok(self.store.find_where(ORDERS, |o: &Order| {
            o.shipment.shipment_id.as_deref() == Some(shipment_id)
        })?)
    }

    /// Newest first
    pub fn list(&self, query: &PageQuery) -> LedgerResult<PaginatedResponse<Order>> {
        let mut orders: Vec<Order> = self.store.list(ORDERS)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(query.paginate(orders))
    }

    pub fn mark_paid(&self, order_id: &str, payment: PaymentRefs) -> LedgerResult<Order> {
        self.transition(order_id, OrderEvent::PaymentVerified, None, |order| {
            if payment.session_ref.is_some() {
                order.payment.session_ref = payment.session_ref;
            }
            order.payment.payment_id = payment.payment_id;
            order.payment.signature = payment.signature;
        })
    }

    pub fn mark_shipped(&self, order_id: &str, shipment: ShipmentRefs) -> LedgerResult<Order> {
        self.transition(order_id, OrderEvent::ShipmentCreated, None, |order| {
            order.shipment = shipment;
        })
    }

    pub fn mark_delivered(&self, order_id: &str) -> LedgerResult<Order> {
        self.transition(order_id, OrderEvent::DeliveryConfirmed, None, |_| {})
    }

    pub fn mark_failed(&self, order_id: &str, note: Option<String>) -> LedgerResult<Order> {
        self.transition(order_id, OrderEvent::Cancelled, note, |_| {})
    }

    /// Record the payment collaborator's session id (only while `created`)
    pub fn attach_session(&self, order_id: &str, session_ref: &str) -> LedgerResult<Order> {
        self.patch(order_id, |order| {
            if order.status != OrderStatus::Created {
                return Err("session can only be attached to a created order");
            }
            order.payment.session_ref = Some(session_ref.to_string());
            Ok(())
        })
    }

    /// Record the carrier's AWB (only while `shipped`)
    pub fn record_awb(
        &self,
        order_id: &str,
        awb: &str,
        courier: Option<String>,
        tracking_url: Option<String>,
    ) -> LedgerResult<Order> {
        self.patch(order_id, |order| {
            if order.status != OrderStatus::Shipped {
                return Err("AWB can only be recorded for a shipped order");
            }
            order.shipment.awb = Some(awb.to_string());
            if courier.is_some() {
                order.shipment.courier = courier;
            }
            if tracking_url.is_some() {
                order.shipment.tracking_url = tracking_url;
            }
            Ok(())
        })
    }

    /// Apply `event` atomically; the stored order is untouched on failure
    fn transition<F>(
        &self,
        order_id: &str,
        event: OrderEvent,
        note: Option<String>,
        apply: F,
    ) -> LedgerResult<Order>
    where
        F: FnOnce(&mut Order),
    {
        let order = self
            .store
            .update(ORDERS, order_id, |current: Option<Order>| {
                let mut order = current.ok_or_else(|| LedgerError::NotFound(order_id.into()))?;
                let from = order.status;
                let to = next_status(from, event).ok_or_else(|| LedgerError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from,
                    event,
                })?;

                apply(&mut order);
                let now = now_millis();
                order.status = to;
                order.history.push(StatusChange {
                    from,
                    to,
                    at: now,
                    note,
                });
                order.version += 1;
                order.updated_at = now;
                Ok(Write::Put(order.clone(), order))
            })
            .inspect_err(|e| {
                if matches!(e, LedgerError::InvalidTransition { .. }) {
                    tracing::warn!(order_id, %event, error = %e, "Rejected order transition");
                }
            })?;

        tracing::info!(
            order_id,
            %event,
            status = %order.status,
            version = order.version,
            "Order transitioned"
        );
        Ok(order)
    }

    /// Non-status mutation guarded by a status check
    fn patch<F>(&self, order_id: &str, apply: F) -> LedgerResult<Order>
    where
        F: FnOnce(&mut Order) -> Result<(), &'static str>,
    {
        self.store
            .update(ORDERS, order_id, |current: Option<Order>| {
                let mut order = current.ok_or_else(|| LedgerError::NotFound(order_id.into()))?;
                let status = order.status;
                apply(&mut order).map_err(|reason| LedgerError::Precondition {
                    order_id: order_id.to_string(),
                    status,
                    reason,
                })?;
                order.version += 1;
                order.updated_at = now_millis();
                Ok(Write::Put(order.clone(), order))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Address;

    fn ledger() -> OrderLedger {
        OrderLedger::new(DocumentStore::open_in_memory().unwrap())
    }

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9999999999".to_string(),
            address: Address {
                line1: "12 Bean St".to_string(),
                line2: None,
                city: "Pune".to_string(),
                state: "MH".to_string(),
                postcode: "411001".to_string(),
                country: "India".to_string(),
            },
        }
    }

    fn item(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: "prod_grape".to_string(),
            variant_id: None,
            name: "Grape Brewy".to_string(),
            sku: None,
            quantity,
            unit_price: Decimal::from(price),
        }
    }

    fn new_order(items: Vec<OrderItem>) -> NewOrder {
        NewOrder {
            customer: customer(),
            items,
            pickup_region: None,
            currency: "INR".to_string(),
        }
    }

    #[test]
    fn test_create_computes_amount() {
        let ledger = ledger();
        let order = ledger
            .create_order(new_order(vec![item(49, 2), item(10, 1)]))
            .unwrap();
        assert_eq!(order.amount, Decimal::from(108));
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.id.starts_with("ord_"));
        assert_eq!(ledger.find_by_order_id(&order.id).unwrap(), order);
    }

    #[test]
    fn test_create_validates_lines() {
        let ledger = ledger();
        assert!(matches!(
            ledger.create_order(new_order(vec![])),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.create_order(new_order(vec![item(49, 0)])),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.create_order(new_order(vec![item(-1, 1)])),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_create_rejects_unrepresentable_total() {
        let ledger = ledger();
        // fits in Decimal but not in i64 minor units
        let huge = item(i64::MAX / 10, u32::MAX);
        assert!(matches!(
            ledger.create_order(new_order(vec![huge])),
            Err(LedgerError::Validation(msg)) if msg.contains("too large")
        ));

        let mut overflow = item(1, 1);
        overflow.unit_price = Decimal::MAX;
        assert!(matches!(
            ledger.create_order(new_order(vec![overflow.clone(), overflow])),
            Err(LedgerError::Validation(_))
        ));

        assert_eq!(ledger.list(&PageQuery::default()).unwrap().total, 0);
    }

    #[test]
    fn test_full_lifecycle_records_history() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 2)])).unwrap();

        let paid = ledger
            .mark_paid(
                &order.id,
                PaymentRefs {
                    session_ref: None,
                    payment_id: Some("pay_1".into()),
                    signature: Some("sig".into()),
                },
            )
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment.payment_id.as_deref(), Some("pay_1"));

        let shipped = ledger
            .mark_shipped(
                &order.id,
                ShipmentRefs {
                    shipment_id: Some("sh_1".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let delivered = ledger.mark_delivered(&order.id).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.history.len(), 3);
        assert_eq!(delivered.history[0].from, OrderStatus::Created);
        assert_eq!(delivered.history[2].to, OrderStatus::Delivered);
        assert_eq!(delivered.version, 4);
    }

    #[test]
    fn test_ship_before_paid_is_rejected_and_unchanged() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 2)])).unwrap();

        let err = ledger
            .mark_shipped(&order.id, ShipmentRefs::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: OrderStatus::Created,
                event: OrderEvent::ShipmentCreated,
                ..
            }
        ));
        assert_eq!(ledger.find_by_order_id(&order.id).unwrap(), order);

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::OrderInvalidTransition);
    }

    #[test]
    fn test_failed_is_terminal() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 1)])).unwrap();
        let failed = ledger
            .mark_failed(&order.id, Some("customer cancelled".into()))
            .unwrap();
        assert_eq!(failed.status, OrderStatus::Failed);
        assert_eq!(
            failed.history[0].note.as_deref(),
            Some("customer cancelled")
        );

        assert!(ledger.mark_paid(&order.id, PaymentRefs::default()).is_err());
        assert!(ledger.mark_failed(&order.id, None).is_err());
    }

    #[test]
    fn test_duplicate_payment_cannot_apply_twice() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 1)])).unwrap();
        ledger.mark_paid(&order.id, PaymentRefs::default()).unwrap();
        let err = ledger
            .mark_paid(&order.id, PaymentRefs::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(ledger.find_by_order_id(&order.id).unwrap().version, 2);
    }

    #[test]
    fn test_unknown_order() {
        let ledger = ledger();
        assert!(matches!(
            ledger.mark_delivered("ord_missing"),
            Err(LedgerError::NotFound(_))
        ));
        let app: AppError = ledger.find_by_order_id("ord_missing").unwrap_err().into();
        assert_eq!(app.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_attach_session_and_lookup() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 1)])).unwrap();
        ledger.attach_session(&order.id, "order_rzp_1").unwrap();

        let found = ledger.find_by_session_ref("order_rzp_1").unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert!(ledger.find_by_session_ref("order_rzp_2").unwrap().is_none());

        ledger.mark_paid(&order.id, PaymentRefs::default()).unwrap();
        let err = ledger.attach_session(&order.id, "order_rzp_3").unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::PreconditionFailed);
        // session ref survives mark_paid without one
        let stored = ledger.find_by_order_id(&order.id).unwrap();
        assert_eq!(stored.payment.session_ref.as_deref(), Some("order_rzp_1"));
    }

    #[test]
    fn test_record_awb_requires_shipped() {
        let ledger = ledger();
        let order = ledger.create_order(new_order(vec![item(49, 1)])).unwrap();
        assert!(matches!(
            ledger.record_awb(&order.id, "AWB1", None, None),
            Err(LedgerError::Precondition { .. })
        ));

        ledger.mark_paid(&order.id, PaymentRefs::default()).unwrap();
        ledger
            .mark_shipped(&order.id, ShipmentRefs::default())
            .unwrap();
        let updated = ledger
            .record_awb(&order.id, "AWB1", Some("Delhivery".into()), None)
            .unwrap();
        assert_eq!(updated.shipment.awb.as_deref(), Some("AWB1"));
        assert_eq!(updated.shipment.courier.as_deref(), Some("Delhivery"));
        assert_eq!(updated.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_list_newest_first() {
        let ledger = ledger();
        let first = ledger.create_order(new_order(vec![item(1, 1)])).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ledger.create_order(new_order(vec![item(2, 1)])).unwrap();

        let page = ledger.list(&PageQuery::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].id, second.id);
        assert_eq!(page.data[1].id, first.id);
    }
}
