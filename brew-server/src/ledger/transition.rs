//! Order state machine
//!
//! ```text
//! created ──PaymentVerified──▶ paid ──ShipmentCreated──▶ shipped ──DeliveryConfirmed──▶ delivered
//!    │                          │
//!    └──────Cancelled───────────┴──────────▶ failed
//! ```

use serde::Serialize;
use shared::models::OrderStatus;
use std::fmt;

/// Events that move an order between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    PaymentVerified,
    ShipmentCreated,
    DeliveryConfirmed,
    Cancelled,
}

impl OrderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentVerified => "payment_verified",
            Self::ShipmentCreated => "shipment_created",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target status for `event` applied in `from`, or `None` if forbidden
pub fn next_status(from: OrderStatus, event: OrderEvent) -> Option<OrderStatus> {
    use OrderEvent::*;
    use OrderStatus::*;

    match (from, event) {
        (Created, PaymentVerified) => Some(Paid),
        (Created, Cancelled) => Some(Failed),
        (Paid, ShipmentCreated) => Some(Shipped),
        (Paid, Cancelled) => Some(Failed),
        (Shipped, DeliveryConfirmed) => Some(Delivered),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderEvent::*;
    use OrderStatus::*;

    const ALL_STATUSES: [OrderStatus; 5] = [Created, Paid, Shipped, Delivered, Failed];
    const ALL_EVENTS: [OrderEvent; 4] =
        [PaymentVerified, ShipmentCreated, DeliveryConfirmed, Cancelled];

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(next_status(Created, PaymentVerified), Some(Paid));
        assert_eq!(next_status(Created, Cancelled), Some(Failed));
        assert_eq!(next_status(Paid, ShipmentCreated), Some(Shipped));
        assert_eq!(next_status(Paid, Cancelled), Some(Failed));
        assert_eq!(next_status(Shipped, DeliveryConfirmed), Some(Delivered));
    }

    #[test]
    fn test_no_skipping_predecessors() {
        assert_eq!(next_status(Created, ShipmentCreated), None);
        assert_eq!(next_status(Created, DeliveryConfirmed), None);
        assert_eq!(next_status(Paid, DeliveryConfirmed), None);
        assert_eq!(next_status(Shipped, Cancelled), None);
        assert_eq!(next_status(Paid, PaymentVerified), None);
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for event in ALL_EVENTS {
                assert_eq!(next_status(*status, event), None, "{status} + {event}");
            }
        }
    }

    #[test]
    fn test_exactly_five_edges() {
        let edges = ALL_STATUSES
            .iter()
            .flat_map(|s| ALL_EVENTS.iter().map(move |e| next_status(*s, *e)))
            .filter(Option::is_some)
            .count();
        assert_eq!(edges, 5);
    }
}
