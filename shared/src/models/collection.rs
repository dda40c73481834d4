//! Collection Model

use serde::{Deserialize, Serialize};

/// Named grouping of products.
///
/// Members are referenced by product id only; products missing at read time
/// are skipped rather than treated as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
