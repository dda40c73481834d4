//! Shipping provider integration

pub mod client;
pub mod coordinator;
pub mod package;
pub mod token;

pub use client::{HttpShippingProvider, ShippingProvider};
pub use coordinator::{
    CARRIER_TOKEN_HEADER, CarrierAck, ShipmentCoordinator, ShipmentCreated, ShippingSettings,
};
pub use package::Package;
pub use token::TokenCache;
