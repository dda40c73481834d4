//! Shipment Coordinator
//!
//! Drives paid orders through the shipping provider and records the
//! provider's references on the order. Status changes go through the
//! ledger; provider-only actions (AWB, pickup, tracking) never change
//! status.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderStatus, ShipmentRefs};

use super::client::{
    AwbAssignment, PickupScheduled, Serviceability, ShipmentLine, ShipmentRequest,
    ShippingProvider, TrackingInfo,
};
use super::package::{self, Package};
use crate::catalog::CatalogStore;
use crate::ledger::{LedgerError, OrderEvent, OrderLedger, next_status};
use crate::security_log;
use crate::signature::constant_time_eq;

/// Header carrying the carrier's callback token
pub const CARRIER_TOKEN_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentCreated {
    pub order_id: String,
    /// Provider shipment id
    pub shipment_ref: String,
    /// Provider order id
    pub order_ref: String,
    pub tracking_url: String,
    pub package: Package,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierAck {
    pub order_id: Option<String>,
    pub status: String,
    pub applied: bool,
}

#[derive(Debug, Deserialize)]
struct CarrierWebhookEvent {
    #[serde(default)]
    awb: Option<String>,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    shipment_id: Option<serde_json::Value>,
    #[serde(default)]
    current_status: String,
    #[serde(default)]
    courier_name: Option<String>,
}

/// Settings the coordinator needs from configuration
#[derive(Debug, Clone)]
pub struct ShippingSettings {
    pub default_pickup_location: String,
    pub tracking_base_url: String,
    pub webhook_token: String,
}

#[derive(Clone)]
pub struct ShipmentCoordinator {
    ledger: OrderLedger,
    catalog: CatalogStore,
    provider: Arc<dyn ShippingProvider>,
    settings: ShippingSettings,
}

impl ShipmentCoordinator {
    pub fn new(
        ledger: OrderLedger,
        catalog: CatalogStore,
        provider: Arc<dyn ShippingProvider>,
        settings: ShippingSettings,
    ) -> Self {
        Self {
            ledger,
            catalog,
            provider,
            settings,
        }
    }

    fn tracking_url(&self, reference: &str) -> String {
        format!(
            "{}/{}",
            self.settings.tracking_base_url.trim_end_matches('/'),
            reference
        )
    }

    /// Package for an order's lines, from current catalog dimensions
    fn package_for(&self, order: &Order) -> AppResult<Package> {
        let mut lines = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let dims = self
                .catalog
                .find_product(&item.product_id)?
                .and_then(|p| p.dimensions);
            lines.push((dims, item.quantity));
        }
        Ok(package::aggregate(
            lines.iter().map(|(d, q)| (d.as_ref(), *q)),
        ))
    }

    /// Create the provider-side shipment for a paid order and mark it shipped
    pub async fn create_shipment(
        &self,
        order_id: &str,
        pickup_region: Option<String>,
    ) -> AppResult<ShipmentCreated> {
        let order = self.ledger.find_by_order_id(order_id)?;
        if order.status != OrderStatus::Paid {
            return Err(AppError::precondition(format!(
                "Order {order_id} is {}, shipment requires a paid order",
                order.status
            ))
            .with_detail("status", order.status.as_str()));
        }

        let package = self.package_for(&order)?;
        let pickup_location = pickup_region
            .or_else(|| order.pickup_region.clone())
            .unwrap_or_else(|| self.settings.default_pickup_location.clone());
        let order_date = chrono::DateTime::from_timestamp_millis(order.created_at)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M")
            .to_string();

        let request = ShipmentRequest {
            order_id: order.id.clone(),
            order_date,
            pickup_location,
            customer: order.customer.clone(),
            lines: order
                .items
                .iter()
                .map(|i| ShipmentLine {
                    name: i.name.clone(),
                    sku: i
                        .sku
                        .clone()
                        .or_else(|| i.variant_id.clone())
                        .unwrap_or_else(|| i.product_id.clone()),
                    units: i.quantity,
                    selling_price: i.unit_price,
                })
                .collect(),
            sub_total: order.amount,
            package,
        };

        let created = self.provider.create_order(request).await?;
        let tracking_url = self.tracking_url(&created.shipment_id);

        let refs = ShipmentRefs {
            order_ref: Some(created.order_ref.clone()),
            shipment_id: Some(created.shipment_id.clone()),
            awb: None,
            courier: None,
            tracking_url: Some(tracking_url.clone()),
        };
        self.ledger
            .mark_shipped(order_id, refs)
            .inspect_err(|e| {
                tracing::error!(
                    order_id,
                    shipment_id = %created.shipment_id,
                    error = %e,
                    "Provider shipment created but order not updated"
                );
            })?;

        Ok(ShipmentCreated {
            order_id: order_id.to_string(),
            shipment_ref: created.shipment_id,
            order_ref: created.order_ref,
            tracking_url,
            package,
        })
    }

    /// Shipment id of an order, or `ShipmentNotCreated`
    fn shipment_of(&self, order_id: &str) -> AppResult<(Order, String)> {
        let order = self.ledger.find_by_order_id(order_id)?;
        match order.shipment.shipment_id.clone() {
            Some(id) if order.status == OrderStatus::Shipped => Ok((order, id)),
            _ => Err(AppError::with_message(
                ErrorCode::ShipmentNotCreated,
                format!("Order {order_id} has no active shipment"),
            )
            .with_detail("status", order.status.as_str())),
        }
    }

    pub async fn assign_awb(
        &self,
        order_id: &str,
        courier_id: Option<String>,
    ) -> AppResult<AwbAssignment> {
        let (_, shipment_id) = self.shipment_of(order_id)?;
        let assignment = self
            .provider
            .assign_awb(&shipment_id, courier_id.as_deref())
            .await?;
        self.ledger.record_awb(
            order_id,
            &assignment.awb,
            assignment.courier.clone(),
            Some(self.tracking_url(&assignment.awb)),
        )?;
        tracing::info!(order_id, awb = %assignment.awb, "AWB assigned");
        Ok(assignment)
    }

    pub async fn request_pickup(&self, order_id: &str) -> AppResult<PickupScheduled> {
        let (order, shipment_id) = self.shipment_of(order_id)?;
        if order.shipment.awb.is_none() {
            return Err(AppError::precondition(format!(
                "Order {order_id} needs an AWB before pickup"
            )));
        }
        let pickup = self.provider.request_pickup(&shipment_id).await?;
        tracing::info!(order_id, shipment_id, "Pickup requested");
        Ok(pickup)
    }

    pub async fn track_shipment(&self, shipment_ref: &str) -> AppResult<TrackingInfo> {
        if shipment_ref.trim().is_empty() {
            return Err(AppError::validation("Shipment id is required"));
        }
        Ok(self.provider.track(shipment_ref).await?)
    }

    /// Cancel an order's shipment and mark the order failed.
    ///
    /// The transition is checked before the provider is called, so an
    /// order that can no longer be cancelled never reaches the provider.
    pub async fn cancel_shipment(&self, order_id: &str) -> AppResult<Order> {
        let order = self.ledger.find_by_order_id(order_id)?;
        if next_status(order.status, OrderEvent::Cancelled).is_none() {
            return Err(LedgerError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status,
                event: OrderEvent::Cancelled,
            }
            .into());
        }

        if let Some(order_ref) = order.shipment.order_ref.clone() {
            self.provider.cancel_orders(&[order_ref]).await?;
        }
        Ok(self
            .ledger
            .mark_failed(order_id, Some("shipment cancelled".to_string()))?)
    }

    pub async fn check_serviceability(
        &self,
        pickup: Option<&str>,
        delivery: &str,
        weight: Option<Decimal>,
    ) -> AppResult<Serviceability> {
        let delivery = delivery.trim();
        if delivery.is_empty() {
            return Err(AppError::validation("Delivery postcode is required"));
        }
        let weight = weight.unwrap_or_else(|| package::default_dimensions().weight);
        if weight <= Decimal::ZERO {
            return Err(AppError::validation("Weight must be positive"));
        }
        let pickup = pickup
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.settings.default_pickup_location.as_str());
        Ok(self
            .provider
            .serviceability(pickup, delivery, weight)
            .await?)
    }

    /// Carrier status callback, authenticated by a shared token
    pub fn handle_carrier_webhook(&self, token: Option<&str>, body: &[u8]) -> AppResult<CarrierAck> {
        let authorized = token.is_some_and(|t| {
            !self.settings.webhook_token.is_empty()
                && constant_time_eq(t, &self.settings.webhook_token)
        });
        if !authorized {
            security_log!(
                WARN,
                "carrier_webhook_rejected",
                reason = if token.is_some() { "bad token" } else { "missing token" }
            );
            return Err(AppError::unauthorized());
        }

        let event: CarrierWebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Malformed carrier event: {e}")))?;
        let status = event.current_status.trim().to_uppercase();
        tracing::info!(
            status = %status,
            awb = event.awb.as_deref().unwrap_or_default(),
            "Received carrier webhook"
        );

        let Some(order) = self.order_for_event(&event)? else {
            tracing::warn!(status = %status, "Carrier event for unknown order");
            return Ok(CarrierAck {
                order_id: None,
                status,
                applied: false,
            });
        };

        let mut ack = CarrierAck {
            order_id: Some(order.id.clone()),
            status: status.clone(),
            applied: false,
        };

        if order.status == OrderStatus::Shipped
            && order.shipment.awb.is_none()
            && let Some(awb) = event.awb.as_deref().filter(|a| !a.is_empty())
        {
            self.ledger
                .record_awb(&order.id, awb, event.courier_name.clone(), None)?;
            ack.applied = true;
        }

        if status == "DELIVERED" {
            match self.ledger.mark_delivered(&order.id) {
                Ok(_) => ack.applied = true,
                Err(LedgerError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    ..
                }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(ack)
    }

    fn order_for_event(&self, event: &CarrierWebhookEvent) -> AppResult<Option<Order>> {
        if let Some(id) = event.order_id.as_deref().filter(|s| !s.is_empty()) {
            match self.ledger.find_by_order_id(id) {
                Ok(order) => return Ok(Some(order)),
                Err(LedgerError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        let shipment_id = event.shipment_id.as_ref().and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        match shipment_id {
            Some(shipment_id) => Ok(self
                .ledger
                .find_by_shipment_id(&shipment_id)?),
            None => Ok(None),
        }
    }
}
