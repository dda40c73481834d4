//! Order and payment confirmation endpoints

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::ApiResponse;
use shared::models::Order;
use shared::{PageQuery, PaginatedResponse};

use super::{ApiResult, AppJson};
use crate::auth::CurrentAdmin;
use crate::payment::{PaymentOutcome, PaymentStatusView};
use crate::state::AppState;

/// Checkout widget callback, field names as the gateway emits them
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentBody {
    #[serde(alias = "razorpay_order_id")]
    pub order_ref: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_ref: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckStatusBody {
    #[serde(alias = "razorpay_order_id", alias = "order_ref")]
    pub session_ref: String,
}

/// POST /orders/verify-payment
pub async fn verify_payment(
    State(state): State<AppState>,
    AppJson(body): AppJson<VerifyPaymentBody>,
) -> ApiResult<Order> {
    let order = state
        .payment
        .confirm(&body.order_ref, &body.payment_ref, &body.signature)?;
    Ok(ApiResponse::success(order))
}

/// POST /orders/check-status
pub async fn check_status(
    State(state): State<AppState>,
    AppJson(body): AppJson<CheckStatusBody>,
) -> ApiResult<PaymentStatusView> {
    Ok(ApiResponse::success(
        state.payment.check_status(&body.session_ref).await?,
    ))
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<Order>> {
    Ok(ApiResponse::success(state.ledger.list(&query)?))
}

/// GET /orders/{id}
pub async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Order> {
    Ok(ApiResponse::success(state.ledger.find_by_order_id(&id)?))
}

/// POST /orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let order = state.payment.reconcile(&id, PaymentOutcome::Cancelled)?;
    tracing::info!(order_id = %id, admin = %admin.username, "Order cancelled by admin");
    Ok(ApiResponse::success(order))
}
