//! Shared types for brew-cloud
//!
//! Common types used by the server and its tests: the error taxonomy,
//! the catalog/order domain models, pagination and small utilities.

pub mod error;
pub mod models;
pub mod pagination;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use pagination::{PageQuery, PaginatedResponse};
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};
