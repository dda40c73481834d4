//! Partner-format catalog reads

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use shared::error::ApiResponse;
use shared::{PageQuery, PaginatedResponse};

use super::ApiResult;
use crate::catalog::{PartnerCollection, PartnerProduct};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/catalog/products", get(list_products))
        .route("/catalog/collections", get(list_collections))
        .route("/catalog/collections/{id}/products", get(collection_products))
}

/// GET /catalog/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<PartnerProduct>> {
    Ok(ApiResponse::success(state.catalog.list_products(&query)?))
}

/// GET /catalog/collections
pub async fn list_collections(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<PartnerCollection>> {
    Ok(ApiResponse::success(state.catalog.list_collections(&query)?))
}

/// GET /catalog/collections/{id}/products
pub async fn collection_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<PartnerProduct>> {
    Ok(ApiResponse::success(
        state.catalog.collection_products(&id, &query)?,
    ))
}
