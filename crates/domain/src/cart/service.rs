//! Cart service: validated cart operations and the derived cart view.

use std::sync::Arc;

use common::{ProductId, UserId};
use serde::Serialize;

use super::{CartLine, CartLineUpdate, CartStore, MAX_LINE_QUANTITY};
use crate::catalog::{Catalog, CatalogExt, SaleStatus};
use crate::error::{BusinessError, Result};
use crate::value_objects::Money;

/// A cart line joined with the product's current catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProductView {
    pub product_id: ProductId,
    pub quantity: u32,
    pub product_name: String,
    pub product_subtitle: String,
    pub product_main_image: String,
    pub product_price: Money,
    pub product_status: SaleStatus,
    pub product_total_price: Money,
    pub product_stock: u32,
    pub product_selected: bool,
}

/// A user's cart with its summary values.
///
/// The summary is recomputed from the stored lines on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(rename = "cartProductVoList")]
    pub lines: Vec<CartProductView>,
    pub select_all: bool,
    #[serde(rename = "cartTotalPrice")]
    pub total_price: Money,
    #[serde(rename = "cartTotalQuantity")]
    pub total_quantity: u64,
}

/// Service for managing users' carts.
///
/// Each operation touches only the calling user's cart.
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
}

impl CartService {
    /// Creates a cart service over the given store and catalog.
    pub fn new(store: Arc<dyn CartStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        selected: bool,
    ) -> Result<CartView> {
        check_quantity(quantity)?;

        let product = self.catalog.find_sellable(product_id).await?;
        if product.stock == 0 {
            return Err(BusinessError::ProductStockError.into());
        }

        let line = self
            .store
            .increment(user_id, product_id, quantity, selected)
            .await?
            .ok_or_else(|| {
                BusinessError::param(format!(
                    "a cart line holds at most {MAX_LINE_QUANTITY} units"
                ))
            })?;
        metrics::counter!("cart_lines_added_total").increment(1);
        tracing::debug!(quantity = line.quantity, "cart line upserted");

        self.list(user_id).await
    }

    /// Returns the user's cart view.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> Result<CartView> {
        let lines = self.store.lines(user_id).await?;
        self.view_of(&lines).await
    }

    /// Updates the quantity and/or selection of an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        update: CartLineUpdate,
    ) -> Result<CartView> {
        if let Some(quantity) = update.quantity {
            check_quantity(quantity)?;
        }

        self.store
            .modify(user_id, product_id, update)
            .await?
            .ok_or(BusinessError::CartProductNotExist)?;

        self.list(user_id).await
    }

    /// Removes a line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<CartView> {
        let removed = self.store.remove(user_id, &[product_id]).await?;
        if removed == 0 {
            return Err(BusinessError::CartProductNotExist.into());
        }

        self.list(user_id).await
    }

    /// Selects or deselects every line.
    #[tracing::instrument(skip(self))]
    pub async fn select_all(&self, user_id: UserId, selected: bool) -> Result<CartView> {
        self.store.set_all_selected(user_id, selected).await?;
        self.list(user_id).await
    }

    /// Returns the total quantity across all lines, selected or not.
    #[tracing::instrument(skip(self))]
    pub async fn sum(&self, user_id: UserId) -> Result<u64> {
        let lines = self.store.lines(user_id).await?;
        Ok(lines.iter().map(|l| u64::from(l.quantity)).sum())
    }

    /// Returns the selected lines in product id order.
    pub async fn selected_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let lines = self.store.lines(user_id).await?;
        Ok(lines.into_iter().filter(|l| l.selected).collect())
    }

    /// Removes the given lines, returning how many existed.
    pub async fn drain(&self, user_id: UserId, product_ids: &[ProductId]) -> Result<usize> {
        Ok(self.store.remove(user_id, product_ids).await?)
    }

    /// Merges a previously drained line back into the cart.
    pub async fn restore(&self, user_id: UserId, line: &CartLine) -> Result<CartLine> {
        Ok(self.store.restore(user_id, line).await?)
    }

    async fn view_of(&self, lines: &[CartLine]) -> Result<CartView> {
        let mut view = CartView {
            lines: Vec::with_capacity(lines.len()),
            select_all: !lines.is_empty(),
            total_price: Money::zero(),
            total_quantity: 0,
        };

        for line in lines {
            if !line.selected {
                view.select_all = false;
            }
            view.total_quantity += u64::from(line.quantity);

            // Dangling lines still count toward quantity and selection.
            let Some(product) = self.catalog.find_by_id(line.product_id).await? else {
                continue;
            };

            let line_total = product.price.multiply(line.quantity);
            if line.selected {
                view.total_price += line_total;
            }
            view.lines.push(CartProductView {
                product_id: line.product_id,
                quantity: line.quantity,
                product_name: product.name,
                product_subtitle: product.subtitle,
                product_main_image: product.main_image,
                product_price: product.price,
                product_status: product.status,
                product_total_price: line_total,
                product_stock: product.stock,
                product_selected: line.selected,
            });
        }

        Ok(view)
    }
}

fn check_quantity(quantity: u32) -> Result<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(BusinessError::param(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        ))
        .into());
    }
    Ok(())
}
