//! Shipping provider client
//!
//! | Call | Endpoint |
//! |------|----------|
//! | login | `POST /v1/external/auth/login` |
//! | create order | `POST /v1/external/orders/create/adhoc` |
//! | assign AWB | `POST /v1/external/courier/assign/awb` |
//! | pickup | `POST /v1/external/courier/generate/pickup` |
//! | track | `GET /v1/external/courier/track/shipment/{id}` |
//! | cancel | `POST /v1/external/orders/cancel` |
//! | serviceability | `GET /v1/external/courier/serviceability/` |
//!
//! All calls but login carry a bearer token from [`TokenCache`]. A 401
//! invalidates the cached token; the failed call is not retried.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use shared::models::CustomerSnapshot;

use super::package::Package;
use super::token::TokenCache;
use crate::collaborator::{CollaboratorError, opt_str_field, read_json, str_field};

const SERVICE: &str = "shipping";

/// One line of a shipping order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentLine {
    pub name: String,
    pub sku: String,
    pub units: u32,
    pub selling_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    /// Our order id
    pub order_id: String,
    /// `YYYY-MM-DD HH:MM`
    pub order_date: String,
    pub pickup_location: String,
    pub customer: CustomerSnapshot,
    pub lines: Vec<ShipmentLine>,
    pub sub_total: Decimal,
    pub package: Package,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedShipment {
    /// Provider-side order id
    pub order_ref: String,
    pub shipment_id: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwbAssignment {
    pub awb: String,
    pub courier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickupScheduled {
    pub shipment_id: String,
    pub scheduled_date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingActivity {
    pub date: String,
    pub status: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingInfo {
    pub shipment_id: String,
    pub current_status: Option<String>,
    pub awb: Option<String>,
    pub etd: Option<String>,
    pub tracking_url: Option<String>,
    pub activities: Vec<TrackingActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierOption {
    pub courier_id: String,
    pub name: String,
    pub rate: Decimal,
    pub etd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serviceability {
    pub serviceable: bool,
    pub carriers: Vec<CarrierOption>,
}

#[async_trait]
pub trait ShippingProvider: Send + Sync {
    async fn create_order(&self, request: ShipmentRequest)
    -> Result<CreatedShipment, CollaboratorError>;

    async fn assign_awb(
        &self,
        shipment_id: &str,
        courier_id: Option<&str>,
    ) -> Result<AwbAssignment, CollaboratorError>;

    async fn request_pickup(&self, shipment_id: &str)
    -> Result<PickupScheduled, CollaboratorError>;

    async fn track(&self, shipment_id: &str) -> Result<TrackingInfo, CollaboratorError>;

    async fn cancel_orders(&self, order_refs: &[String]) -> Result<(), CollaboratorError>;

    async fn serviceability(
        &self,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight: Decimal,
    ) -> Result<Serviceability, CollaboratorError>;
}

pub struct HttpShippingProvider {
    client: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    tokens: TokenCache,
}

impl HttpShippingProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        tokens: TokenCache,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            password: password.into(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/external{}", self.base_url, path)
    }

    async fn login(&self) -> Result<String, CollaboratorError> {
        tracing::info!("Logging in to shipping provider");
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": self.email, "password": self.password }))
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(SERVICE, e))?;
        let body = read_json(SERVICE, resp).await?;
        str_field(SERVICE, &body, "/token")
    }

    /// Send an authorized request built by `build`
    async fn call<F>(&self, build: F) -> Result<Value, CollaboratorError>
    where
        F: FnOnce(&reqwest::Client) -> RequestBuilder + Send,
    {
        let token = self.tokens.get_valid_token(|| self.login()).await?;
        let resp = build(&self.client)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(SERVICE, e))?;

        match read_json(SERVICE, resp).await {
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Shipping token rejected, clearing cache");
                self.tokens.invalidate().await;
                Err(e)
            }
            other => other,
        }
    }
}

fn order_body(request: &ShipmentRequest) -> Value {
    let c = &request.customer;
    let (first_name, last_name) = c.name.split_once(' ').unwrap_or((c.name.as_str(), ""));
    serde_json::json!({
        "order_id": request.order_id,
        "order_date": request.order_date,
        "pickup_location": request.pickup_location,
        "billing_customer_name": first_name,
        "billing_last_name": last_name,
        "billing_address": c.address.line1,
        "billing_address_2": c.address.line2.clone().unwrap_or_default(),
        "billing_city": c.address.city,
        "billing_pincode": c.address.postcode,
        "billing_state": c.address.state,
        "billing_country": c.address.country,
        "billing_email": c.email,
        "billing_phone": c.phone,
        "shipping_is_billing": true,
        "order_items": request.lines,
        "payment_method": "Prepaid",
        "sub_total": request.sub_total,
        "length": request.package.length,
        "breadth": request.package.breadth,
        "height": request.package.height,
        "weight": request.package.weight,
    })
}

fn parse_tracking(shipment_id: &str, body: &Value) -> TrackingInfo {
    let data = body.get("tracking_data").unwrap_or(body);
    let track = data.pointer("/shipment_track/0").cloned().unwrap_or(Value::Null);
    let activities = data
        .get("shipment_track_activities")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|a| TrackingActivity {
                    date: opt_str_field(a, "/date").unwrap_or_default(),
                    status: opt_str_field(a, "/activity")
                        .or_else(|| opt_str_field(a, "/status"))
                        .unwrap_or_default(),
                    location: opt_str_field(a, "/location"),
                })
                .collect()
        })
        .unwrap_or_default();

    TrackingInfo {
        shipment_id: shipment_id.to_string(),
        current_status: opt_str_field(&track, "/current_status"),
        awb: opt_str_field(&track, "/awb_code"),
        etd: opt_str_field(&track, "/edd").or_else(|| opt_str_field(data, "/etd")),
        tracking_url: opt_str_field(data, "/track_url"),
        activities,
    }
}

fn parse_carriers(body: &Value) -> Vec<CarrierOption> {
    body.pointer("/data/available_courier_companies")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|c| {
                    Some(CarrierOption {
                        courier_id: opt_str_field(c, "/courier_company_id")?,
                        name: opt_str_field(c, "/courier_name").unwrap_or_default(),
                        rate: opt_str_field(c, "/rate")
                            .and_then(|r| r.parse().ok())
                            .unwrap_or_default(),
                        etd: opt_str_field(c, "/etd"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ShippingProvider for HttpShippingProvider {
    async fn create_order(
        &self,
        request: ShipmentRequest,
    ) -> Result<CreatedShipment, CollaboratorError> {
        let body = order_body(&request);
        let resp = self
            .call(|c| c.post(self.url("/orders/create/adhoc")).json(&body))
            .await?;
        Ok(CreatedShipment {
            order_ref: str_field(SERVICE, &resp, "/order_id")?,
            shipment_id: str_field(SERVICE, &resp, "/shipment_id")?,
            status: opt_str_field(&resp, "/status"),
        })
    }

    async fn assign_awb(
        &self,
        shipment_id: &str,
        courier_id: Option<&str>,
    ) -> Result<AwbAssignment, CollaboratorError> {
        let mut body = serde_json::json!({ "shipment_id": shipment_id });
        if let Some(courier_id) = courier_id {
            body["courier_id"] = Value::String(courier_id.to_string());
        }
        let resp = self
            .call(|c| c.post(self.url("/courier/assign/awb")).json(&body))
            .await?;
        Ok(AwbAssignment {
            awb: str_field(SERVICE, &resp, "/response/data/awb_code")?,
            courier: opt_str_field(&resp, "/response/data/courier_name"),
        })
    }

    async fn request_pickup(
        &self,
        shipment_id: &str,
    ) -> Result<PickupScheduled, CollaboratorError> {
        let body = serde_json::json!({ "shipment_id": [shipment_id] });
        let resp = self
            .call(|c| c.post(self.url("/courier/generate/pickup")).json(&body))
            .await?;
        Ok(PickupScheduled {
            shipment_id: shipment_id.to_string(),
            scheduled_date: opt_str_field(&resp, "/response/pickup_scheduled_date"),
            status: opt_str_field(&resp, "/response/data")
                .or_else(|| opt_str_field(&resp, "/pickup_status")),
        })
    }

    async fn track(&self, shipment_id: &str) -> Result<TrackingInfo, CollaboratorError> {
        let path = format!("/courier/track/shipment/{shipment_id}");
        let resp = self.call(|c| c.get(self.url(&path))).await?;
        Ok(parse_tracking(shipment_id, &resp))
    }

    async fn cancel_orders(&self, order_refs: &[String]) -> Result<(), CollaboratorError> {
        let body = serde_json::json!({ "ids": order_refs });
        self.call(|c| c.post(self.url("/orders/cancel")).json(&body))
            .await?;
        Ok(())
    }

    async fn serviceability(
        &self,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight: Decimal,
    ) -> Result<Serviceability, CollaboratorError> {
        let weight = weight.to_string();
        let query = [
            ("pickup_postcode", pickup_postcode),
            ("delivery_postcode", delivery_postcode),
            ("weight", weight.as_str()),
            ("cod", "0"),
        ];
        let resp = match self
            .call(|c| c.get(self.url("/courier/serviceability/")).query(&query))
            .await
        {
            Ok(resp) => resp,
            // The provider answers 404 when no carrier covers the route
            Err(CollaboratorError::Rejected { status: 404, .. }) => Value::Null,
            Err(e) => return Err(e),
        };
        let carriers = parse_carriers(&resp);
        Ok(Serviceability {
            serviceable: !carriers.is_empty(),
            carriers,
        })
    }
}
