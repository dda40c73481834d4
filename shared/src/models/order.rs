//! Order Model
//!
//! Orders are never deleted; every status change is appended to `history`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Paid,
    Shipped,
    Delivered,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address captured with the order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

/// Customer contact and address, immutable after order creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub address: Address,
}

/// One ordered line; `unit_price` is frozen at order time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// `None` when the product overflows `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Payment collaborator references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRefs {
    /// Collaborator-side order/session id
    #[serde(default)]
    pub session_ref: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Shipping collaborator references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRefs {
    /// Collaborator-side order id
    #[serde(default)]
    pub order_ref: Option<String>,
    #[serde(default)]
    pub shipment_id: Option<String>,
    #[serde(default)]
    pub awb: Option<String>,
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
}

/// Audit entry for one status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Order document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub pickup_region: Option<String>,
    #[serde(default)]
    pub payment: PaymentRefs,
    #[serde(default)]
    pub shipment: ShipmentRefs,
    #[serde(default)]
    pub history: Vec<StatusChange>,
    /// Bumped on every mutation
    #[serde(default)]
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Server-side total of all lines, `None` on overflow
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }

    /// Amount in minor currency units (paise/cents), as collaborators expect.
    ///
    /// The ledger refuses orders whose amount has no `i64` minor-unit form,
    /// so this is `Some` for every stored order.
    pub fn amount_minor(&self) -> Option<i64> {
        to_minor_units(self.amount)
    }
}

/// Convert a major-unit amount to minor units, rounding half away from zero.
///
/// `None` when the result does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::RoundingStrategy;
    use rust_decimal::prelude::ToPrimitive;
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}
