//! Catalog Store Adapter
//!
//! Products and collections are stored in internal form and rendered in the
//! partner's wire format on the way out. Partner pushes go through
//! [`adapter`] which validates, converts and upserts keyed by external id.

pub mod adapter;
pub mod partner;

pub use adapter::{UpsertResult, apply_collection_update, apply_product_update, slugify};
pub use partner::{
    PartnerCollection, PartnerCollectionPayload, PartnerProduct, PartnerProductPayload,
    to_partner_collection, to_partner_product,
};

use rust_decimal::Decimal;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Collection, Product, Variant};
use shared::{PageQuery, PaginatedResponse};

use crate::store::{COLLECTIONS, DocumentStore, PRODUCTS};

/// A sellable line: the product plus the variant that was asked for, if any
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub product: Product,
    pub variant: Option<Variant>,
}

impl ResolvedItem {
    /// Server-held unit price
    pub fn unit_price(&self) -> Decimal {
        self.variant
            .as_ref()
            .map_or(self.product.price, |v| v.price)
    }

    pub fn is_available(&self) -> bool {
        self.product.available && self.variant.as_ref().is_none_or(|v| v.available)
    }

    pub fn display_name(&self) -> String {
        match &self.variant {
            Some(v) if v.title != "Default Title" => format!("{} - {}", self.product.name, v.title),
            _ => self.product.name.clone(),
        }
    }

    pub fn sku(&self) -> Option<String> {
        self.variant.as_ref().and_then(|v| v.sku.clone())
    }
}

/// Read/write access to products and collections
#[derive(Clone)]
pub struct CatalogStore {
    store: DocumentStore,
}

impl CatalogStore {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        Ok(self.store.get(PRODUCTS, id)?)
    }

    pub fn find_collection(&self, id: &str) -> AppResult<Option<Collection>> {
        Ok(self.store.get(COLLECTIONS, id)?)
    }

    /// Resolve a cart reference that may be a product id or a variant id
    pub fn resolve(&self, id: &str) -> AppResult<Option<ResolvedItem>> {
        if let Some(product) = self.find_product(id)? {
            return Ok(Some(ResolvedItem {
                product,
                variant: None,
            }));
        }

        let owner: Option<Product> = self
            .store
            .find_where(PRODUCTS, |p: &Product| p.variant(id).is_some())?;
        Ok(owner.and_then(|product| {
            let variant = product.variant(id).cloned()?;
            Some(ResolvedItem {
                product,
                variant: Some(variant),
            })
        }))
    }

    /// Resolve and require the item to be sellable.
    ///
    /// Fails with `ProductNotFound` naming `id`, or `ProductUnavailable`
    /// naming the product.
    pub fn resolve_sellable(&self, id: &str) -> AppResult<ResolvedItem> {
        let item = self.resolve(id)?.ok_or_else(|| {
            AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found"))
                .with_detail("id", id)
        })?;
        if !item.is_available() {
            return Err(AppError::with_message(
                ErrorCode::ProductUnavailable,
                format!("{} is not available", item.product.name),
            )
            .with_detail("product_id", item.product.id.clone()));
        }
        Ok(item)
    }

    pub fn list_products(&self, query: &PageQuery) -> AppResult<PaginatedResponse<PartnerProduct>> {
        let products: Vec<Product> = self.store.list(PRODUCTS)?;
        Ok(query.paginate(products).map(|p| to_partner_product(&p)))
    }

    pub fn list_collections(
        &self,
        query: &PageQuery,
    ) -> AppResult<PaginatedResponse<PartnerCollection>> {
        let collections: Vec<Collection> = self.store.list(COLLECTIONS)?;
        Ok(query.paginate(collections).map(|c| to_partner_collection(&c)))
    }

    /// Members of a collection; ids with no stored product are skipped
    pub fn collection_products(
        &self,
        collection_id: &str,
        query: &PageQuery,
    ) -> AppResult<PaginatedResponse<PartnerProduct>> {
        let collection = self.find_collection(collection_id)?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::CollectionNotFound,
                format!("Collection {collection_id} not found"),
            )
        })?;

        let mut members = Vec::with_capacity(collection.product_ids.len());
        for id in &collection.product_ids {
            match self.find_product(id)? {
                Some(product) => members.push(product),
                None => tracing::debug!(collection_id, product_id = %id, "Skipping missing member"),
            }
        }
        Ok(query.paginate(members).map(|p| to_partner_product(&p)))
    }

    pub fn apply_product_update(&self, payload: PartnerProductPayload) -> AppResult<UpsertResult> {
        apply_product_update(&self.store, payload)
    }

    pub fn apply_collection_update(
        &self,
        payload: PartnerCollectionPayload,
    ) -> AppResult<UpsertResult> {
        apply_collection_update(&self.store, payload)
    }
}
