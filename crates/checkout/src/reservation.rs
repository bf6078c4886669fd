//! Inventory reservation: turns selected cart lines into order line
//! snapshots while taking stock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderNo, UserId};
use domain::{BusinessError, CartService, Catalog, CatalogExt, OrderLine, Result};

use crate::compensation::CompensationLog;
use crate::policy::StockDecrementPolicy;

/// Reserves stock for a user's selected cart lines.
///
/// Lines are processed one at a time in product id order. Each line is
/// atomic on its own; a failure part-way leaves earlier lines reserved and
/// drained, and it is up to the caller to undo them from the
/// [`CompensationLog`].
pub struct InventoryReservation {
    carts: Arc<CartService>,
    catalog: Arc<dyn Catalog>,
    policy: StockDecrementPolicy,
}

impl InventoryReservation {
    pub fn new(
        carts: Arc<CartService>,
        catalog: Arc<dyn Catalog>,
        policy: StockDecrementPolicy,
    ) -> Self {
        Self {
            carts,
            catalog,
            policy,
        }
    }

    /// Reserves every selected line of the user's cart.
    ///
    /// Fails with `CART_SELECTED_IS_EMPTY` before touching any product when
    /// nothing is selected.
    #[tracing::instrument(skip(self, log))]
    pub async fn reserve(
        &self,
        user_id: UserId,
        order_no: OrderNo,
        now: DateTime<Utc>,
        log: &mut CompensationLog,
    ) -> Result<Vec<OrderLine>> {
        let selected = self.carts.selected_lines(user_id).await?;
        if selected.is_empty() {
            return Err(BusinessError::CartSelectedIsEmpty.into());
        }

        let mut lines = Vec::with_capacity(selected.len());
        for cart_line in selected {
            let mut product = self.catalog.find_sellable(cart_line.product_id).await?;
            if product.stock < cart_line.quantity {
                tracing::info!(
                    product_id = %product.id,
                    stock = product.stock,
                    requested = cart_line.quantity,
                    "insufficient stock"
                );
                return Err(BusinessError::ProductStockError.into());
            }

            let units = self.policy.units_for(cart_line.quantity);
            product.stock -= units;
            let product = self.catalog.save(&product).await?;
            log.record_decrement(cart_line, units);

            lines.push(OrderLine::snapshot(
                order_no,
                user_id,
                &product,
                cart_line.quantity,
                now,
            ));

            self.carts.drain(user_id, &[cart_line.product_id]).await?;
            log.mark_drained();
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::{InMemoryCartStore, InMemoryCatalog, Money, Product, SaleStatus};

    const USER: UserId = UserId::new(1);

    async fn setup(policy: StockDecrementPolicy) -> (InventoryReservation, Arc<CartService>, InMemoryCatalog) {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(Product::new(ProductId::new(7), "Widget", Money::from_cents(1000), 5))
            .await;
        catalog
            .insert(Product::new(ProductId::new(8), "Gadget", Money::from_cents(250), 1))
            .await;
        let carts = Arc::new(CartService::new(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(catalog.clone()),
        ));
        let reservation = InventoryReservation::new(carts.clone(), Arc::new(catalog.clone()), policy);
        (reservation, carts, catalog)
    }

    #[tokio::test]
    async fn test_reserves_selected_lines_only() {
        let (reservation, carts, catalog) = setup(StockDecrementPolicy::OneUnitPerLine).await;
        carts.add(USER, ProductId::new(7), 3, true).await.unwrap();
        carts.add(USER, ProductId::new(8), 1, false).await.unwrap();

        let mut log = CompensationLog::new();
        let lines = reservation
            .reserve(USER, OrderNo::new(1), Utc::now(), &mut log)
            .await
            .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].line_total, Money::from_cents(3000));
        assert_eq!(catalog.stock_of(ProductId::new(7)).await, Some(4));
        assert_eq!(catalog.stock_of(ProductId::new(8)).await, Some(1));

        let remaining = carts.list(USER).await.unwrap();
        assert_eq!(remaining.lines.len(), 1);
        assert_eq!(remaining.lines[0].product_id, ProductId::new(8));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_full_quantity_policy() {
        let (reservation, carts, catalog) = setup(StockDecrementPolicy::FullQuantity).await;
        carts.add(USER, ProductId::new(7), 3, true).await.unwrap();

        let mut log = CompensationLog::new();
        reservation
            .reserve(USER, OrderNo::new(1), Utc::now(), &mut log)
            .await
            .unwrap();

        assert_eq!(catalog.stock_of(ProductId::new(7)).await, Some(2));
        assert_eq!(log.undo_order().next().map(|e| e.units), Some(3));
    }

    #[tokio::test]
    async fn test_empty_selection_touches_nothing() {
        let (reservation, carts, catalog) = setup(StockDecrementPolicy::OneUnitPerLine).await;
        carts.add(USER, ProductId::new(7), 1, false).await.unwrap();

        let mut log = CompensationLog::new();
        let err = reservation
            .reserve(USER, OrderNo::new(1), Utc::now(), &mut log)
            .await
            .unwrap_err();

        assert!(err.is(&BusinessError::CartSelectedIsEmpty));
        assert_eq!(catalog.stock_of(ProductId::new(7)).await, Some(5));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_list_leaves_earlier_lines_applied() {
        // Reservation alone does not roll back; the log is what the
        // coordinator uses to undo the first line.
        let (reservation, carts, catalog) = setup(StockDecrementPolicy::OneUnitPerLine).await;
        carts.add(USER, ProductId::new(7), 2, true).await.unwrap();
        carts.add(USER, ProductId::new(8), 1, true).await.unwrap();
        carts
            .update(
                USER,
                ProductId::new(8),
                domain::CartLineUpdate {
                    quantity: Some(2),
                    selected: None,
                },
            )
            .await
            .unwrap();

        let mut log = CompensationLog::new();
        let err = reservation
            .reserve(USER, OrderNo::new(1), Utc::now(), &mut log)
            .await
            .unwrap_err();

        assert!(err.is(&BusinessError::ProductStockError));
        assert_eq!(catalog.stock_of(ProductId::new(7)).await, Some(4));
        assert_eq!(log.len(), 1);

        let cart = carts.list(USER).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].product_id, ProductId::new(8));
    }

    #[tokio::test]
    async fn test_off_sale_product_is_rejected() {
        let (reservation, carts, catalog) = setup(StockDecrementPolicy::OneUnitPerLine).await;
        carts.add(USER, ProductId::new(7), 1, true).await.unwrap();
        catalog
            .insert(
                Product::new(ProductId::new(7), "Widget", Money::from_cents(1000), 5)
                    .with_status(SaleStatus::OffSale),
            )
            .await;

        let mut log = CompensationLog::new();
        let err = reservation
            .reserve(USER, OrderNo::new(1), Utc::now(), &mut log)
            .await
            .unwrap_err();

        assert!(err.is(&BusinessError::ProductOffSaleOrDelete));
        assert!(log.is_empty());
    }
}
