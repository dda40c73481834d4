//! Data models
//!
//! Shared between brew-server and its API clients.
//! Catalog ids are external string identifiers; order ids are `ord_<snowflake>`.

pub mod admin;
pub mod collection;
pub mod order;
pub mod product;

// Re-exports
pub use admin::*;
pub use collection::*;
pub use order::*;
pub use product::*;
