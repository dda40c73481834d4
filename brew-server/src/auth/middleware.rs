//! Admin middleware
//!
//! ```ignore
//! Router::new()
//!     .route("/shipment/cancel", post(cancel))
//!     .layer(middleware::from_fn(require_elevated))
//!     .layer(middleware::from_fn_with_state(state.clone(), require_admin));
//! ```
//!
//! `require_admin` must run first (outermost): it injects [`CurrentAdmin`]
//! which `require_elevated` and handlers read back.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};

use super::authenticator::CurrentAdmin;
use crate::security_log;
use crate::state::AppState;

/// Authenticate with any strategy; any role passes
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let admin = state.auth.authenticate(req.headers()).inspect_err(|_| {
        security_log!(WARN, "admin_auth_failed", uri = %req.uri());
    })?;
    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}

/// Requires the elevated role (after `require_admin`)
pub async fn require_elevated(req: Request, next: Next) -> Result<Response, AppError> {
    let admin = req
        .extensions()
        .get::<CurrentAdmin>()
        .ok_or_else(AppError::unauthorized)?;
    if !admin.is_elevated() {
        security_log!(
            WARN,
            "elevated_role_required",
            username = %admin.username,
            role = %admin.role,
            uri = %req.uri()
        );
        return Err(AppError::with_message(
            ErrorCode::ElevatedRoleRequired,
            "This action requires the elevated admin role",
        ));
    }
    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAdmin>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}
