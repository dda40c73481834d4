//! Inbound webhooks
//!
//! Handlers take the raw body: every sender signs the exact bytes it sent,
//! so verification runs before anything is parsed or stored.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::de::DeserializeOwned;
use shared::error::{AppError, ApiResponse};

use super::ApiResult;
use crate::catalog::{PartnerCollectionPayload, PartnerProductPayload, UpsertResult};
use crate::payment::{WEBHOOK_SIGNATURE_HEADER, WebhookAck};
use crate::security_log;
use crate::shipping::{CARRIER_TOKEN_HEADER, CarrierAck};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/product", post(product_webhook))
        .route("/webhooks/collection", post(collection_webhook))
        .route("/webhooks/payment", post(payment_webhook))
        .route("/webhooks/shipment", post(shipment_webhook))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verify a catalog partner delivery and decode its payload
fn verified_payload<T: DeserializeOwned>(
    state: &AppState,
    source: &'static str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, AppError> {
    if let Err(e) = state.catalog_verifier.verify_headers(headers, body) {
        security_log!(WARN, "catalog_webhook_rejected", source, reason = %e);
        return Err(e.into());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("Malformed {source} payload: {e}")))
}

/// POST /webhooks/product
pub async fn product_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UpsertResult> {
    let payload: PartnerProductPayload = verified_payload(&state, "product", &headers, &body)?;
    let result = state.catalog.apply_product_update(payload)?;
    tracing::info!(
        product_id = %result.id,
        created = result.created,
        changed = result.changed,
        "Product webhook applied"
    );
    Ok(ApiResponse::success(result))
}

/// POST /webhooks/collection
pub async fn collection_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UpsertResult> {
    let payload: PartnerCollectionPayload =
        verified_payload(&state, "collection", &headers, &body)?;
    let result = state.catalog.apply_collection_update(payload)?;
    tracing::info!(
        collection_id = %result.id,
        created = result.created,
        changed = result.changed,
        "Collection webhook applied"
    );
    Ok(ApiResponse::success(result))
}

/// POST /webhooks/payment
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    let signature = header(&headers, WEBHOOK_SIGNATURE_HEADER);
    Ok(ApiResponse::success(
        state.payment.handle_webhook(&body, signature)?,
    ))
}

/// POST /webhooks/shipment
pub async fn shipment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<CarrierAck> {
    let token = header(&headers, CARRIER_TOKEN_HEADER);
    Ok(ApiResponse::success(
        state.shipping.handle_carrier_webhook(token, &body)?,
    ))
}
