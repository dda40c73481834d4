//! Admin login

use axum::extract::State;
use shared::error::ApiResponse;

use super::{ApiResult, AppJson};
use crate::auth::{LoginRequest, LoginResponse};
use crate::state::AppState;

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    Ok(ApiResponse::success(state.admins.login(&body)?))
}
