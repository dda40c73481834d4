//! Shipment endpoints

use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::Order;

use super::{ApiResult, AppJson};
use crate::shipping::ShipmentCreated;
use crate::shipping::client::{AwbAssignment, PickupScheduled, Serviceability, TrackingInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateShipmentBody {
    pub order_id: String,
    #[serde(default)]
    pub pickup_region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateAwbBody {
    pub order_id: String,
    #[serde(default)]
    pub courier_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderRefBody {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ServiceabilityQuery {
    #[serde(default)]
    pub pickup: Option<String>,
    pub delivery: String,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

/// POST /shipment/create
pub async fn create(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateShipmentBody>,
) -> ApiResult<ShipmentCreated> {
    Ok(ApiResponse::success(
        state
            .shipping
            .create_shipment(&body.order_id, body.pickup_region)
            .await?,
    ))
}

/// POST /shipment/generate-awb
pub async fn generate_awb(
    State(state): State<AppState>,
    AppJson(body): AppJson<GenerateAwbBody>,
) -> ApiResult<AwbAssignment> {
    Ok(ApiResponse::success(
        state
            .shipping
            .assign_awb(&body.order_id, body.courier_id)
            .await?,
    ))
}

/// POST /shipment/request-pickup
pub async fn request_pickup(
    State(state): State<AppState>,
    AppJson(body): AppJson<OrderRefBody>,
) -> ApiResult<PickupScheduled> {
    Ok(ApiResponse::success(
        state.shipping.request_pickup(&body.order_id).await?,
    ))
}

/// POST /shipment/cancel
pub async fn cancel(
    State(state): State<AppState>,
    AppJson(body): AppJson<OrderRefBody>,
) -> ApiResult<Order> {
    Ok(ApiResponse::success(
        state.shipping.cancel_shipment(&body.order_id).await?,
    ))
}

/// GET /shipment/track/{id}
pub async fn track(
    State(state): State<AppState>,
    Path(shipment_id): Path<String>,
) -> ApiResult<TrackingInfo> {
    Ok(ApiResponse::success(
        state.shipping.track_shipment(&shipment_id).await?,
    ))
}

/// GET /shipment/serviceability
pub async fn serviceability(
    State(state): State<AppState>,
    Query(query): Query<ServiceabilityQuery>,
) -> ApiResult<Serviceability> {
    Ok(ApiResponse::success(
        state
            .shipping
            .check_serviceability(query.pickup.as_deref(), &query.delivery, query.weight)
            .await?,
    ))
}
