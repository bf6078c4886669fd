//! Catalog gateway: product records and their storage port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{BusinessError, DomainError, StoreError};
use crate::value_objects::Money;

/// Sale status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[default]
    OnSale,
    OffSale,
    Deleted,
}

impl SaleStatus {
    /// Returns the persisted status code.
    pub fn code(&self) -> i16 {
        match self {
            SaleStatus::OnSale => 1,
            SaleStatus::OffSale => 2,
            SaleStatus::Deleted => 3,
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(SaleStatus::OnSale),
            2 => Some(SaleStatus::OffSale),
            3 => Some(SaleStatus::Deleted),
            _ => None,
        }
    }

    /// Returns true if products in this status may be carted or ordered.
    pub fn is_sellable(&self) -> bool {
        matches!(self, SaleStatus::OnSale)
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: i64,
    pub name: String,
    pub subtitle: String,
    pub main_image: String,
    pub price: Money,
    pub stock: u32,
    pub status: SaleStatus,
    /// Optimistic concurrency version, bumped by every successful save.
    pub version: i64,
}

impl Product {
    /// Creates an on-sale product at version 0.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id,
            category_id: 0,
            name: name.into(),
            subtitle: String::new(),
            main_image: String::new(),
            price,
            stock,
            status: SaleStatus::OnSale,
            version: 0,
        }
    }

    /// Sets the sale status.
    pub fn with_status(mut self, status: SaleStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the subtitle and main image used by cart and order views.
    pub fn with_details(mut self, subtitle: impl Into<String>, main_image: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self.main_image = main_image.into();
        self
    }
}

/// Storage port for product records.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Loads a product by id regardless of its sale status.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Persists a product.
    ///
    /// The write only succeeds if the stored version still equals
    /// `product.version`; otherwise `ConcurrencyConflict` is returned.
    /// Returns the product as stored, with its version bumped.
    async fn save(&self, product: &Product) -> Result<Product, StoreError>;
}

/// Business-level lookups on top of [`Catalog`].
#[async_trait]
pub trait CatalogExt: Catalog {
    /// Loads a product, failing with `PRODUCT_NOT_EXIST` if absent.
    async fn find_existing(&self, id: ProductId) -> Result<Product, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| BusinessError::ProductNotExist.into())
    }

    /// Loads a product that is currently on sale.
    async fn find_sellable(&self, id: ProductId) -> Result<Product, DomainError> {
        let product = self.find_existing(id).await?;
        if !product.status.is_sellable() {
            return Err(BusinessError::ProductOffSaleOrDelete.into());
        }
        Ok(product)
    }
}

impl<T: Catalog + ?Sized> CatalogExt for T {}

/// In-memory catalog for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product without a version check.
    pub async fn insert(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.products.read().await.get(&id).map(|p| p.stock)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn save(&self, product: &Product) -> Result<Product, StoreError> {
        let mut products = self.products.write().await;
        let actual = products.get(&product.id).map_or(0, |p| p.version);
        if actual != product.version {
            return Err(StoreError::ConcurrencyConflict {
                entity: "product",
                id: product.id.to_string(),
                expected: product.version,
                actual,
            });
        }

        let mut stored = product.clone();
        stored.version += 1;
        products.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
