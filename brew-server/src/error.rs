//! Unified service-layer error type
//!
//! `ServiceError` bridges storage errors (`StoreError`) and the API-layer
//! error (`AppError`) so handlers can use `?` on both without manual
//! `map_err` boilerplate.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::store::StoreError;

static EXPOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Attach the underlying error text to internal errors (`trace` detail).
///
/// Enabled outside production only.
pub fn set_expose_diagnostics(enabled: bool) {
    EXPOSE_DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

pub fn expose_diagnostics() -> bool {
    EXPOSE_DIAGNOSTICS.load(Ordering::Relaxed)
}

/// Log an infrastructure failure and convert it to an opaque `AppError`
pub fn internal(code: ErrorCode, err: impl Display) -> AppError {
    let text = err.to_string();
    tracing::error!(error = %text, code = %code, "Internal service error");
    let app = AppError::new(code);
    if expose_diagnostics() {
        app.with_detail("trace", text)
    } else {
        app
    }
}

/// Service-layer error
///
/// - `Store`: storage/infrastructure errors (auto-logged, mapped to DatabaseError)
/// - `App`: business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Store(StoreError::AlreadyExists(key)) => {
                AppError::already_exists(key)
            }
            ServiceError::Store(StoreError::Serialization(err)) => {
                internal(ErrorCode::StorageCorrupted, err)
            }
            ServiceError::Store(err) => internal(ErrorCode::DatabaseError, err),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e).into()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
