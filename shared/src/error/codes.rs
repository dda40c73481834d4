//! Error codes, grouped by range:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Catalog errors
//! - 7xxx: Shipping errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric error code, serialized as a bare `u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    ValidationFailed = 2,
    NotFound = 3,
    AlreadyExists = 4,
    PreconditionFailed = 9,

    // ==================== 1xxx: Auth ====================
    NotAuthenticated = 1001,
    InvalidCredentials = 1002,
    TokenExpired = 1003,
    TokenInvalid = 1004,
    SignatureInvalid = 1008,

    // ==================== 2xxx: Permission ====================
    PermissionDenied = 2001,
    ElevatedRoleRequired = 2002,

    // ==================== 4xxx: Order ====================
    OrderNotFound = 4001,
    OrderInvalidTransition = 4008,

    // ==================== 5xxx: Payment ====================
    PaymentSignatureInvalid = 5006,
    PaymentAmountMismatch = 5007,

    // ==================== 6xxx: Catalog ====================
    ProductNotFound = 6001,
    ProductUnavailable = 6003,
    CollectionNotFound = 6101,

    // ==================== 7xxx: Shipping ====================
    ShipmentNotCreated = 7001,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    NetworkError = 9003,
    TimeoutError = 9004,
    UpstreamError = 9006,
    StorageCorrupted = 9403,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default English message
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::PreconditionFailed => "Precondition failed",

            // Auth
            ErrorCode::NotAuthenticated => "Not authenticated",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::SignatureInvalid => "Request signature is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::ElevatedRoleRequired => "Elevated admin role is required",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInvalidTransition => "Order status transition not allowed",

            // Payment
            ErrorCode::PaymentSignatureInvalid => "Payment signature verification failed",
            ErrorCode::PaymentAmountMismatch => "Paid amount does not match order amount",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductUnavailable => "Product is not available",
            ErrorCode::CollectionNotFound => "Collection not found",

            // Shipping
            ErrorCode::ShipmentNotCreated => "Shipment has not been created",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::UpstreamError => "External service request failed",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            9 => Ok(ErrorCode::PreconditionFailed),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1008 => Ok(ErrorCode::SignatureInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::ElevatedRoleRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4008 => Ok(ErrorCode::OrderInvalidTransition),

            // Payment
            5006 => Ok(ErrorCode::PaymentSignatureInvalid),
            5007 => Ok(ErrorCode::PaymentAmountMismatch),

            // Catalog
            6001 => Ok(ErrorCode::ProductNotFound),
            6003 => Ok(ErrorCode::ProductUnavailable),
            6101 => Ok(ErrorCode::CollectionNotFound),

            // Shipping
            7001 => Ok(ErrorCode::ShipmentNotCreated),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9006 => Ok(ErrorCode::UpstreamError),
            9403 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::PreconditionFailed.code(), 9);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::SignatureInvalid.code(), 1008);
        assert_eq!(ErrorCode::ElevatedRoleRequired.code(), 2002);
        assert_eq!(ErrorCode::OrderInvalidTransition.code(), 4008);
        assert_eq!(ErrorCode::PaymentSignatureInvalid.code(), 5006);
        assert_eq!(ErrorCode::ProductUnavailable.code(), 6003);
        assert_eq!(ErrorCode::ShipmentNotCreated.code(), 7001);
        assert_eq!(ErrorCode::UpstreamError.code(), 9006);
    }

    #[test]
    fn test_try_from_u16() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(4008), Ok(ErrorCode::OrderInvalidTransition));
        assert_eq!(ErrorCode::try_from(9006), Ok(ErrorCode::UpstreamError));
        assert_eq!(ErrorCode::try_from(8001), Err(InvalidErrorCode(8001)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");

        let code: ErrorCode = serde_json::from_str("6003").unwrap();
        assert_eq!(code, ErrorCode::ProductUnavailable);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::NotFound.is_success());
    }
}
