//! HTTP API
//!
//! | Group | Auth |
//! |-------|------|
//! | health, catalog reads, checkout, payment confirmation, serviceability | public |
//! | `/webhooks/*` | per-sender signature or token |
//! | order lookup, shipment create/track | any admin |
//! | cancel, AWB, pickup | elevated admin |

pub mod admin;
pub mod catalog;
pub mod checkout;
mod extract;
pub mod health;
pub mod orders;
pub mod shipment;
pub mod webhooks;

use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::error::{AppError, ApiResponse};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{require_admin, require_elevated};
use crate::state::AppState;

pub use extract::AppJson;

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Routes open to anyone (webhooks authenticate themselves)
fn public_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(catalog::router())
        .merge(webhooks::router())
        .merge(checkout::router())
        .route("/orders/verify-payment", post(orders::verify_payment))
        .route("/orders/check-status", post(orders::check_status))
        .route("/shipment/serviceability", get(shipment::serviceability))
        .route("/admin/login", post(admin::login))
}

fn admin_router(state: &AppState) -> Router<AppState> {
    let elevated = Router::new()
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/shipment/generate-awb", post(shipment::generate_awb))
        .route("/shipment/request-pickup", post(shipment::request_pickup))
        .route("/shipment/cancel", post(shipment::cancel))
        .route_layer(middleware::from_fn(require_elevated));

    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::get_order))
        .route("/shipment/create", post(shipment::create))
        .route("/shipment/track/{id}", get(shipment::track))
        .merge(elevated)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

/// Full application router with middleware and state
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_router())
        .merge(admin_router(&state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id.clone(), XRequestId))
        .layer(PropagateRequestIdLayer::new(request_id))
        .with_state(state)
}
