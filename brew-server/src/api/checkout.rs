//! Storefront checkout endpoints

use axum::{Router, extract::State, routing::post};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::CustomerSnapshot;

use super::{ApiResult, AppJson};
use crate::checkout::{CartItem, CartToken, CheckoutSession};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout/generate-token", post(generate_token))
        .route("/orders/create", post(create_order))
}

#[derive(Debug, Deserialize)]
pub struct CartData {
    pub items: Vec<CartItem>,
}

/// `{ "cart_data": { "items": [...] }, "redirect_url": ... }`
#[derive(Debug, Deserialize)]
pub struct CartTokenBody {
    pub cart_data: CartData,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Amount or total fields in the body are accepted and ignored
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub items: Vec<CartItem>,
    pub customer: CustomerSnapshot,
    #[serde(default, alias = "pickup_postcode")]
    pub pickup_region: Option<String>,
}

/// POST /checkout/generate-token
pub async fn generate_token(
    State(state): State<AppState>,
    AppJson(body): AppJson<CartTokenBody>,
) -> ApiResult<CartToken> {
    let token = state
        .checkout
        .generate_cart_token(body.cart_data.items, body.redirect_url)
        .await?;
    Ok(ApiResponse::success(token))
}

/// POST /orders/create
pub async fn create_order(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateOrderBody>,
) -> ApiResult<CheckoutSession> {
    let session = state
        .checkout
        .create_session(body.items, body.customer, body.pickup_region)
        .await?;
    Ok(ApiResponse::success(session))
}
