//! Partner payload → internal model conversion and idempotent upsert

use shared::error::{AppError, AppResult};
use shared::models::{Collection, Dimensions, Product, Variant};
use shared::util::now_millis;

use super::partner::{PartnerCollectionPayload, PartnerProductPayload, VariantPayload};
use crate::store::{COLLECTIONS, DocumentStore, PRODUCTS, Write};

/// Result of applying one partner update
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UpsertResult {
    pub id: String,
    /// No record existed under this id before
    pub created: bool,
    /// Stored fields differ from before (false for a replayed payload)
    pub changed: bool,
}

/// URL-safe handle: lowercase, whitespace runs collapsed to `-`
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn require_identity(id: &str, title: &str, kind: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::validation(format!("{kind} id is required"))
            .with_detail("field", "id"));
    }
    if title.trim().is_empty() {
        return Err(AppError::validation(format!("{kind} title is required"))
            .with_detail("field", "title"));
    }
    Ok(())
}

fn convert_variant(payload: VariantPayload, fallback_price: rust_decimal::Decimal) -> Variant {
    Variant {
        title: non_empty(payload.title).unwrap_or_else(|| "Default Title".to_string()),
        price: payload
            .price
            .map(|p| p.to_decimal())
            .unwrap_or(fallback_price),
        available: payload.available.unwrap_or(true),
        sku: non_empty(payload.sku),
        stock: payload.inventory_quantity.unwrap_or(0),
        id: payload.id,
    }
}

/// Build the product a payload describes, layered over the stored record.
///
/// Fields present in the payload replace stored values; absent ones keep
/// what was stored (or defaults for a new product). Timestamps are carried
/// over from `existing` and bumped by the caller only when something changed.
pub fn product_from_payload(
    payload: PartnerProductPayload,
    existing: Option<&Product>,
) -> AppResult<Product> {
    require_identity(&payload.id, &payload.title, "Product")?;

    let name = payload.title.trim().to_string();
    let handle = non_empty(payload.handle)
        .or_else(|| existing.map(|p| p.handle.clone()))
        .unwrap_or_else(|| slugify(&name));

    let explicit_price = payload.price.as_ref().map(|p| p.to_decimal());
    let fallback_price = explicit_price
        .or_else(|| existing.map(|p| p.price))
        .unwrap_or_default();

    let variants_given = payload.variants.is_some();
    let variants: Vec<Variant> = match payload.variants {
        Some(list) => list
            .into_iter()
            .filter(|v| !v.id.trim().is_empty())
            .map(|v| convert_variant(v, fallback_price))
            .collect(),
        None => existing.map(|p| p.variants.clone()).unwrap_or_default(),
    };

    let price = explicit_price
        .or_else(|| variants.first().map(|v| v.price))
        .unwrap_or(fallback_price);

    // Product stock is the variant total when the partner sends variants only
    let stock = payload
        .inventory_quantity
        .or_else(|| {
            variants_given.then(|| variants.iter().map(|v| v.stock).fold(0, i64::saturating_add))
        })
        .or_else(|| existing.map(|p| p.stock))
        .unwrap_or(0);

    let available = payload
        .available
        .or_else(|| payload.status.as_deref().map(|s| s == "active"))
        .or_else(|| existing.map(|p| p.available))
        .unwrap_or(true);

    let dimensions = match payload.dimensions {
        Some(d) => Some(Dimensions::new(
            d.length.to_decimal(),
            d.breadth.to_decimal(),
            d.height.to_decimal(),
            d.weight.to_decimal(),
        )),
        None => existing.and_then(|p| p.dimensions),
    };

    let now = now_millis();
    Ok(Product {
        id: payload.id.trim().to_string(),
        name,
        handle,
        description: payload
            .body_html
            .or_else(|| existing.map(|p| p.description.clone()))
            .unwrap_or_default(),
        price,
        compare_at_price: payload
            .compare_at_price
            .map(|p| p.to_decimal())
            .or_else(|| existing.and_then(|p| p.compare_at_price)),
        stock,
        available,
        images: match payload.images {
            Some(images) => images
                .into_iter()
                .map(|i| i.src)
                .filter(|src| !src.is_empty())
                .collect(),
            None => existing.map(|p| p.images.clone()).unwrap_or_default(),
        },
        tags: match payload.tags {
            Some(tags) => tags.into_vec(),
            None => existing.map(|p| p.tags.clone()).unwrap_or_default(),
        },
        variants,
        dimensions,
        created_at: existing.map_or(now, |p| p.created_at),
        updated_at: existing.map_or(now, |p| p.updated_at),
    })
}

pub fn collection_from_payload(
    payload: PartnerCollectionPayload,
    existing: Option<&Collection>,
) -> AppResult<Collection> {
    require_identity(&payload.id, &payload.title, "Collection")?;

    let title = payload.title.trim().to_string();
    let now = now_millis();
    Ok(Collection {
        id: payload.id.trim().to_string(),
        handle: non_empty(payload.handle)
            .or_else(|| existing.map(|c| c.handle.clone()))
            .unwrap_or_else(|| slugify(&title)),
        title,
        description: payload
            .body_html
            .or_else(|| existing.map(|c| c.description.clone()))
            .unwrap_or_default(),
        image: match payload.image {
            Some(image) => Some(image.src).filter(|src| !src.is_empty()),
            None => existing.and_then(|c| c.image.clone()),
        },
        product_ids: payload
            .product_ids
            .or_else(|| existing.map(|c| c.product_ids.clone()))
            .unwrap_or_default(),
        created_at: existing.map_or(now, |c| c.created_at),
        updated_at: existing.map_or(now, |c| c.updated_at),
    })
}

/// Upsert a partner product keyed by its external id.
///
/// Replaying the same payload is a no-op: nothing is written and the stored
/// timestamps stay as they were.
pub fn apply_product_update(
    store: &DocumentStore,
    payload: PartnerProductPayload,
) -> AppResult<UpsertResult> {
    let key = payload.id.trim().to_string();
    require_identity(&key, &payload.title, "Product")?;

    store.update(PRODUCTS, &key, |current: Option<Product>| {
        let mut next = product_from_payload(payload, current.as_ref())?;
        let result = UpsertResult {
            id: key.clone(),
            created: current.is_none(),
            changed: current.as_ref() != Some(&next),
        };
        if !result.changed {
            return Ok(Write::Skip(result));
        }
        next.updated_at = now_millis();
        Ok(Write::Put(next, result))
    })
}

pub fn apply_collection_update(
    store: &DocumentStore,
    payload: PartnerCollectionPayload,
) -> AppResult<UpsertResult> {
    let key = payload.id.trim().to_string();
    require_identity(&key, &payload.title, "Collection")?;

    store.update(COLLECTIONS, &key, |current: Option<Collection>| {
        let mut next = collection_from_payload(payload, current.as_ref())?;
        let result = UpsertResult {
            id: key.clone(),
            created: current.is_none(),
            changed: current.as_ref() != Some(&next),
        };
        if !result.changed {
            return Ok(Write::Skip(result));
        }
        next.updated_at = now_millis();
        Ok(Write::Put(next, result))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::error::ErrorCode;

    fn product_payload(json: serde_json::Value) -> PartnerProductPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Grape Brewy"), "grape-brewy");
        assert_eq!(slugify("  Cold \t Brew   Kit "), "cold-brew-kit");
        assert_eq!(slugify("single"), "single");
    }

    #[test]
    fn test_new_product_derives_handle_and_parses_price() {
        let store = DocumentStore::open_in_memory().unwrap();
        let result = apply_product_update(
            &store,
            product_payload(serde_json::json!({
                "id": "prod_grape", "title": "Grape Brewy", "price": "49"
            })),
        )
        .unwrap();
        assert!(result.created && result.changed);

        let stored: Product = store.get(PRODUCTS, "prod_grape").unwrap().unwrap();
        assert_eq!(stored.handle, "grape-brewy");
        assert_eq!(stored.price, Decimal::from(49));
        assert!(stored.available);
        assert!(stored.images.is_empty());
    }

    #[test]
    fn test_replayed_payload_is_idempotent() {
        let store = DocumentStore::open_in_memory().unwrap();
        let json = serde_json::json!({
            "id": "prod_grape", "title": "Grape Brewy", "price": "49",
            "tags": "coffee", "images": [{"src": "https://cdn/g.png"}],
            "dimensions": {"length": 6, "breadth": 6, "height": 12, "weight": "0.35"}
        });
        apply_product_update(&store, product_payload(json.clone())).unwrap();
        let first: Product = store.get(PRODUCTS, "prod_grape").unwrap().unwrap();

        let again = apply_product_update(&store, product_payload(json)).unwrap();
        assert!(!again.created);
        assert!(!again.changed);

        let second: Product = store.get(PRODUCTS, "prod_grape").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count(PRODUCTS).unwrap(), 1);
    }

    #[test]
    fn test_existing_handle_survives_update_without_handle() {
        let store = DocumentStore::open_in_memory().unwrap();
        apply_product_update(
            &store,
            product_payload(serde_json::json!({
                "id": "prod_grape", "title": "Grape Brewy", "handle": "grape-special"
            })),
        )
        .unwrap();
        apply_product_update(
            &store,
            product_payload(serde_json::json!({
                "id": "prod_grape", "title": "Grape Brewy Reloaded", "price": 55
            })),
        )
        .unwrap();

        let stored: Product = store.get(PRODUCTS, "prod_grape").unwrap().unwrap();
        assert_eq!(stored.handle, "grape-special");
        assert_eq!(stored.name, "Grape Brewy Reloaded");
        assert_eq!(stored.price, Decimal::from(55));
    }

    #[test]
    fn test_absent_optional_fields_keep_prior_values() {
        let store = DocumentStore::open_in_memory().unwrap();
        apply_product_update(
            &store,
            product_payload(serde_json::json!({
                "id": "p1", "title": "Mug", "price": "10",
                "images": [{"src": "a.png"}],
                "dimensions": {"length": 1, "breadth": 2, "height": 3, "weight": 4}
            })),
        )
        .unwrap();
        apply_product_update(
            &store,
            product_payload(serde_json::json!({"id": "p1", "title": "Mug", "price": "12"})),
        )
        .unwrap();

        let stored: Product = store.get(PRODUCTS, "p1").unwrap().unwrap();
        assert_eq!(stored.images, vec!["a.png"]);
        assert_eq!(stored.dimensions.unwrap().height, Decimal::from(3));
        assert_eq!(stored.price, Decimal::from(12));
    }

    #[test]
    fn test_unparsable_price_becomes_zero() {
        let p = product_from_payload(
            product_payload(serde_json::json!({"id": "p", "title": "T", "price": "n/a"})),
            None,
        )
        .unwrap();
        assert_eq!(p.price, Decimal::ZERO);
    }

    #[test]
    fn test_variant_prices_and_availability() {
        let p = product_from_payload(
            product_payload(serde_json::json!({
                "id": "p", "title": "T", "status": "draft",
                "variants": [
                    {"id": "v1", "title": "Small", "price": "5.50", "inventory_quantity": 2},
                    {"id": "v2", "inventory_quantity": 3}
                ]
            })),
            None,
        )
        .unwrap();
        assert!(!p.available);
        assert_eq!(p.price, Decimal::new(550, 2));
        assert_eq!(p.variants[1].price, Decimal::ZERO);
        assert_eq!(p.stock, 5);
    }

    #[test]
    fn test_variant_stock_total_saturates() {
        let p = product_from_payload(
            product_payload(serde_json::json!({
                "id": "p", "title": "T",
                "variants": [
                    {"id": "v1", "inventory_quantity": i64::MAX},
                    {"id": "v2", "inventory_quantity": i64::MAX}
                ]
            })),
            None,
        )
        .unwrap();
        assert_eq!(p.stock, i64::MAX);
    }

    #[test]
    fn test_missing_identity_rejected_before_write() {
        let store = DocumentStore::open_in_memory().unwrap();
        let err = apply_product_update(
            &store,
            product_payload(serde_json::json!({"id": "", "title": "T"})),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = apply_collection_update(
            &store,
            serde_json::from_value(serde_json::json!({"id": "c1"})).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(store.count(PRODUCTS).unwrap(), 0);
        assert_eq!(store.count(COLLECTIONS).unwrap(), 0);
    }

    #[test]
    fn test_collection_upsert() {
        let store = DocumentStore::open_in_memory().unwrap();
        let payload = || -> PartnerCollectionPayload {
            serde_json::from_value(serde_json::json!({
                "id": "col_summer", "title": "Summer Picks",
                "product_ids": ["prod_grape", "prod_ghost"]
            }))
            .unwrap()
        };
        let first = apply_collection_update(&store, payload()).unwrap();
        assert!(first.created);
        let second = apply_collection_update(&store, payload()).unwrap();
        assert!(!second.changed);

        let stored: Collection = store.get(COLLECTIONS, "col_summer").unwrap().unwrap();
        assert_eq!(stored.handle, "summer-picks");
        assert_eq!(stored.product_ids.len(), 2);
    }
}
