//! Shared fixtures: in-memory store, fake collaborators, fixed secrets

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{Address, CustomerSnapshot};

use brew_server::checkout::partner::{CartTokenRequest, CheckoutPartner};
use brew_server::collaborator::CollaboratorError;
use brew_server::config::Config;
use brew_server::payment::{PaymentGateway, PaymentSession, SessionRequest, SessionStatus};
use brew_server::shipping::client::{
    AwbAssignment, CreatedShipment, PickupScheduled, Serviceability, ShipmentRequest,
    ShippingProvider, TrackingInfo,
};
use brew_server::signature::{DigestEncoding, compute_signature};
use brew_server::state::{AppState, Collaborators};
use brew_server::store::DocumentStore;

pub const CATALOG_KEY: &str = "test-catalog-key";
pub const CATALOG_SECRET: &str = "test-catalog-secret";
pub const PAYMENT_KEY_SECRET: &str = "test-payment-secret";
pub const PAYMENT_WEBHOOK_SECRET: &str = "test-payment-webhook-secret";
pub const CARRIER_TOKEN: &str = "test-carrier-token";

pub fn test_config() -> Config {
    let env: HashMap<&str, &str> = HashMap::from([
        ("ENVIRONMENT", "development"),
        ("JWT_SECRET", "test-jwt-secret-at-least-32-bytes-long"),
        ("CATALOG_API_KEY", CATALOG_KEY),
        ("CATALOG_API_SECRET", CATALOG_SECRET),
        ("PAYMENT_KEY_SECRET", PAYMENT_KEY_SECRET),
        ("PAYMENT_WEBHOOK_SECRET", PAYMENT_WEBHOOK_SECRET),
        ("SHIPPING_WEBHOOK_TOKEN", CARRIER_TOKEN),
        ("ADMIN_STATIC_SECRET", "test-static-secret"),
    ]);
    Config::from_lookup(|name: &str| env.get(name).map(|v| v.to_string())).unwrap()
}

/// Payment gateway that opens `order_gw_<receipt>` sessions
pub struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<PaymentSession, CollaboratorError> {
        Ok(PaymentSession {
            session_ref: format!("order_gw_{}", request.receipt),
            amount_minor: request.amount_minor,
            currency: request.currency,
            status: "created".into(),
        })
    }

    async fn fetch_session(&self, session_ref: &str) -> Result<SessionStatus, CollaboratorError> {
        Ok(SessionStatus {
            session_ref: session_ref.to_string(),
            status: "created".into(),
            amount_minor: 0,
            amount_paid_minor: 0,
            receipt: None,
        })
    }

    fn public_key(&self) -> &str {
        "rzp_test_key"
    }
}

/// Shipping provider that records created shipments
#[derive(Default)]
pub struct FakeShipping {
    pub created: Mutex<Vec<ShipmentRequest>>,
}

#[async_trait]
impl ShippingProvider for FakeShipping {
    async fn create_order(
        &self,
        request: ShipmentRequest,
    ) -> Result<CreatedShipment, CollaboratorError> {
        let mut created = self.created.lock().unwrap();
        created.push(request);
        Ok(CreatedShipment {
            order_ref: format!("sr_{}", created.len()),
            shipment_id: format!("ship_{}", created.len()),
            status: Some("NEW".into()),
        })
    }

    async fn assign_awb(
        &self,
        _shipment_id: &str,
        courier_id: Option<&str>,
    ) -> Result<AwbAssignment, CollaboratorError> {
        Ok(AwbAssignment {
            awb: "AWB123".into(),
            courier: courier_id.map(str::to_string),
        })
    }

    async fn request_pickup(
        &self,
        shipment_id: &str,
    ) -> Result<PickupScheduled, CollaboratorError> {
        Ok(PickupScheduled {
            shipment_id: shipment_id.to_string(),
            scheduled_date: None,
            status: Some("scheduled".into()),
        })
    }

    async fn track(&self, shipment_id: &str) -> Result<TrackingInfo, CollaboratorError> {
        Ok(TrackingInfo {
            shipment_id: shipment_id.to_string(),
            current_status: Some("NEW".into()),
            awb: None,
            etd: None,
            tracking_url: None,
            activities: vec![],
        })
    }

    async fn cancel_orders(&self, _order_refs: &[String]) -> Result<(), CollaboratorError> {
        Ok(())
    }

    async fn serviceability(
        &self,
        _pickup_postcode: &str,
        _delivery_postcode: &str,
        _weight: Decimal,
    ) -> Result<Serviceability, CollaboratorError> {
        Ok(Serviceability {
            serviceable: false,
            carriers: vec![],
        })
    }
}

pub struct FakePartner;

#[async_trait]
impl CheckoutPartner for FakePartner {
    async fn create_cart_token(
        &self,
        request: CartTokenRequest,
    ) -> Result<String, CollaboratorError> {
        Ok(format!("cart-{}", request.items.len()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub config: Config,
    pub shipping: Arc<FakeShipping>,
}

pub fn test_app() -> TestApp {
    let config = test_config();
    let shipping = Arc::new(FakeShipping::default());
    let collaborators = Collaborators {
        payment: Arc::new(FakeGateway),
        shipping: shipping.clone(),
        checkout: Arc::new(FakePartner),
    };
    let store = DocumentStore::open_in_memory().unwrap();
    let state = AppState::build(&config, store, collaborators);
    TestApp {
        state,
        config,
        shipping,
    }
}

pub const GRAPE_PAYLOAD: &str = r#"{"id":"prod_grape","title":"Grape Brewy","price":"49","inventory_quantity":20,"status":"active"}"#;

/// Push the grape product through the catalog adapter
pub fn seed_grape(state: &AppState) {
    let payload = serde_json::from_str(GRAPE_PAYLOAD).unwrap();
    state.catalog.apply_product_update(payload).unwrap();
}

pub fn hex_signature(secret: &str, body: &[u8]) -> String {
    compute_signature(secret, body, DigestEncoding::Hex).unwrap()
}

pub fn customer() -> CustomerSnapshot {
    CustomerSnapshot {
        name: "Asha Rao".into(),
        email: "asha@example.com".into(),
        phone: "9999999999".into(),
        address: Address {
            line1: "1 MG Road".into(),
            line2: None,
            city: "Pune".into(),
            state: "MH".into(),
            postcode: "411001".into(),
            country: "India".into(),
        },
    }
}
