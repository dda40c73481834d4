//! Partner wire format
//!
//! Outbound shapes (`PartnerProduct`, `PartnerCollection`) are what the
//! checkout/catalog partner reads from `/catalog/*`. Inbound shapes
//! (`*Payload`) are what it pushes to `/webhooks/*`; they are validated and
//! converted to internal models at the boundary.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Collection, Product};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerImage {
    #[serde(default)]
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerVariant {
    pub id: String,
    pub product_id: String,
    pub title: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<String>,
    pub sku: String,
    pub inventory_quantity: i64,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerDimensions {
    pub length: String,
    pub breadth: String,
    pub height: String,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub body_html: String,
    /// `active` when sellable, `draft` otherwise
    pub status: &'static str,
    /// Comma-separated
    pub tags: String,
    pub image: PartnerImage,
    pub images: Vec<PartnerImage>,
    pub variants: Vec<PartnerVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<PartnerDimensions>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerCollection {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub body_html: String,
    pub image: PartnerImage,
    pub product_ids: Vec<String>,
    pub updated_at: i64,
}

/// Render a product in partner format.
///
/// A product without variants is exported with one default variant that
/// carries the product's id, price and availability.
pub fn to_partner_product(product: &Product) -> PartnerProduct {
    let images: Vec<PartnerImage> = product
        .images
        .iter()
        .map(|src| PartnerImage { src: src.clone() })
        .collect();
    let image = images.first().cloned().unwrap_or_default();

    let variants = if product.variants.is_empty() {
        vec![PartnerVariant {
            id: product.id.clone(),
            product_id: product.id.clone(),
            title: "Default Title".to_string(),
            price: product.price.to_string(),
            compare_at_price: product.compare_at_price.map(|p| p.to_string()),
            sku: String::new(),
            inventory_quantity: product.stock,
            available: product.available,
        }]
    } else {
        product
            .variants
            .iter()
            .map(|v| PartnerVariant {
                id: v.id.clone(),
                product_id: product.id.clone(),
                title: v.title.clone(),
                price: v.price.to_string(),
                compare_at_price: None,
                sku: v.sku.clone().unwrap_or_default(),
                inventory_quantity: v.stock,
                available: v.available && product.available,
            })
            .collect()
    };

    PartnerProduct {
        id: product.id.clone(),
        title: product.name.clone(),
        handle: product.handle.clone(),
        body_html: product.description.clone(),
        status: if product.available { "active" } else { "draft" },
        tags: product.tags.join(", "),
        image,
        images,
        variants,
        dimensions: product.dimensions.map(|d| PartnerDimensions {
            length: d.length.to_string(),
            breadth: d.breadth.to_string(),
            height: d.height.to_string(),
            weight: d.weight.to_string(),
        }),
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

pub fn to_partner_collection(collection: &Collection) -> PartnerCollection {
    PartnerCollection {
        id: collection.id.clone(),
        title: collection.title.clone(),
        handle: collection.handle.clone(),
        body_html: collection.description.clone(),
        image: PartnerImage {
            src: collection.image.clone().unwrap_or_default(),
        },
        product_ids: collection.product_ids.clone(),
        updated_at: collection.updated_at,
    }
}

// ========== Inbound payloads ==========

/// Numeric field the partner sends either as a string or a JSON number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseDecimal {
    Text(String),
    Number(serde_json::Number),
}

impl LooseDecimal {
    /// Parse to a decimal, falling back to zero on garbage
    pub fn to_decimal(&self) -> Decimal {
        let text = match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Tags arrive as a comma-separated string or a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    Joined(String),
    List(Vec<String>),
}

impl TagList {
    pub fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Self::Joined(s) => s.split(',').map(str::to_string).collect(),
            Self::List(v) => v,
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantPayload {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<LooseDecimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionsPayload {
    pub length: LooseDecimal,
    pub breadth: LooseDecimal,
    pub height: LooseDecimal,
    pub weight: LooseDecimal,
}

/// Product pushed by the partner
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartnerProductPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub price: Option<LooseDecimal>,
    #[serde(default)]
    pub compare_at_price: Option<LooseDecimal>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default)]
    pub available: Option<bool>,
    /// `active` | `draft` | `archived`; used when `available` is absent
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Option<TagList>,
    #[serde(default)]
    pub images: Option<Vec<PartnerImage>>,
    #[serde(default)]
    pub variants: Option<Vec<VariantPayload>>,
    #[serde(default)]
    pub dimensions: Option<DimensionsPayload>,
}

/// Collection pushed by the partner
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartnerCollectionPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub image: Option<PartnerImage>,
    #[serde(default)]
    pub product_ids: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Dimensions, Variant};

    fn product() -> Product {
        Product {
            id: "prod_grape".to_string(),
            name: "Grape Brewy".to_string(),
            handle: "grape-brewy".to_string(),
            description: "Cold brew".to_string(),
            price: Decimal::from(49),
            compare_at_price: None,
            stock: 12,
            available: true,
            images: vec![],
            tags: vec!["coffee".to_string(), "cold".to_string()],
            variants: vec![],
            dimensions: None,
            created_at: 1,
            updated_at: 2,
        }
    }

    #[test]
    fn test_empty_images_yield_empty_src() {
        let out = to_partner_product(&product());
        assert_eq!(out.image.src, "");
        assert!(out.images.is_empty());
        assert_eq!(out.tags, "coffee, cold");
        assert_eq!(out.status, "active");
    }

    #[test]
    fn test_default_variant_for_simple_product() {
        let out = to_partner_product(&product());
        assert_eq!(out.variants.len(), 1);
        assert_eq!(out.variants[0].id, "prod_grape");
        assert_eq!(out.variants[0].price, "49");
        assert_eq!(out.variants[0].inventory_quantity, 12);
    }

    #[test]
    fn test_variants_inherit_product_availability() {
        let mut p = product();
        p.available = false;
        p.images = vec!["https://cdn/x.png".to_string()];
        p.dimensions = Some(Dimensions::new(
            Decimal::from(6),
            Decimal::from(6),
            Decimal::from(12),
            Decimal::new(35, 2),
        ));
        p.variants = vec![Variant {
            id: "var_1".to_string(),
            title: "500ml".to_string(),
            price: Decimal::new(5500, 2),
            available: true,
            sku: Some("GB-500".to_string()),
            stock: 3,
        }];
        let out = to_partner_product(&p);
        assert_eq!(out.image.src, "https://cdn/x.png");
        assert_eq!(out.status, "draft");
        assert!(!out.variants[0].available);
        assert_eq!(out.variants[0].price, "55.00");
        assert_eq!(out.dimensions.unwrap().weight, "0.35");
    }

    #[test]
    fn test_loose_decimal_parsing() {
        let parse = |json: &str| serde_json::from_str::<LooseDecimal>(json).unwrap().to_decimal();
        assert_eq!(parse("\"49.50\""), Decimal::new(4950, 2));
        assert_eq!(parse("49"), Decimal::from(49));
        assert_eq!(parse("12.5"), Decimal::new(125, 1));
        assert_eq!(parse("\"abc\""), Decimal::ZERO);
        assert_eq!(parse("\"\""), Decimal::ZERO);
    }

    #[test]
    fn test_tag_list_forms() {
        let joined: TagList = serde_json::from_str("\"a, b,,c \"").unwrap();
        assert_eq!(joined.into_vec(), vec!["a", "b", "c"]);
        let list: TagList = serde_json::from_str("[\"x\", \" \"]").unwrap();
        assert_eq!(list.into_vec(), vec!["x"]);
    }

    #[test]
    fn test_collection_without_image() {
        let c = Collection {
            id: "col_1".to_string(),
            title: "Summer".to_string(),
            handle: "summer".to_string(),
            description: String::new(),
            image: None,
            product_ids: vec!["prod_grape".to_string()],
            created_at: 0,
            updated_at: 0,
        };
        let out = to_partner_collection(&c);
        assert_eq!(out.image.src, "");
        assert_eq!(out.product_ids, vec!["prod_grape"]);
    }
}
