//! brew-server: storefront backend
//!
//! Catalog mirror, order ledger, checkout, payment confirmation, shipment
//! coordination and admin authentication behind one axum router.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod payment;
pub mod shipping;
pub mod signature;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;
