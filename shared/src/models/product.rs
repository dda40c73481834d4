//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product, keyed by its stable external identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// External identifier (business key)
    pub id: String,
    pub name: String,
    /// URL-safe slug, derived from the name when the partner sends none
    pub handle: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    pub available: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Physical package size used for shipping calculations
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Look up one of this product's variants
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// Sellable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub available: bool,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock: i64,
}

/// Package dimensions: length/breadth/height in cm, weight in kg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Decimal,
    pub breadth: Decimal,
    pub height: Decimal,
    pub weight: Decimal,
}

impl Dimensions {
    pub fn new(length: Decimal, breadth: Decimal, height: Decimal, weight: Decimal) -> Self {
        Self {
            length,
            breadth,
            height,
            weight,
        }
    }
}
