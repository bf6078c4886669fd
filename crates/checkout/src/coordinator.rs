//! Checkout coordinator: runs reservation and assembly as a saga.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderNo, ShippingId, UserId};
use domain::{
    AddressBook, BusinessError, CartService, Catalog, Order, OrderLine, OrderRepository,
    OrderView, Result, Shipping, StoreError,
};

use crate::assembler::OrderAssembler;
use crate::compensation::{CompensationLog, ReservedLine};
use crate::reservation::InventoryReservation;

const RESTOCK_ATTEMPTS: usize = 3;

/// A freshly persisted order with its lines and address.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub shipping: Shipping,
}

impl PlacedOrder {
    pub fn into_view(self) -> OrderView {
        OrderView::new(&self.order, self.lines, Some(self.shipping))
    }
}

/// Orchestrates checkout.
///
/// The address lookup and the inventory reservation run concurrently and
/// are both driven to completion. If anything fails after stock has been
/// taken, every reserved line is undone newest first (stock restored, cart
/// line merged back) and the original error is returned.
pub struct CheckoutCoordinator {
    reservation: InventoryReservation,
    assembler: OrderAssembler,
    carts: Arc<CartService>,
    catalog: Arc<dyn Catalog>,
    addresses: Arc<dyn AddressBook>,
    orders: Arc<dyn OrderRepository>,
}

impl CheckoutCoordinator {
    pub fn new(
        reservation: InventoryReservation,
        assembler: OrderAssembler,
        carts: Arc<CartService>,
        catalog: Arc<dyn Catalog>,
        addresses: Arc<dyn AddressBook>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            reservation,
            assembler,
            carts,
            catalog,
            addresses,
            orders,
        }
    }

    /// Turns the user's selected cart lines into an unpaid order.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId, shipping_id: ShippingId) -> Result<PlacedOrder> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        let now = Utc::now();
        let order_no = self.assembler.next_order_no(now);
        let mut log = CompensationLog::new();

        let result = self
            .place(user_id, shipping_id, order_no, now, &mut log)
            .await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        match result {
            Ok(placed) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    %order_no,
                    lines = placed.lines.len(),
                    payment = %placed.order.payment(),
                    duration,
                    "checkout completed"
                );
                Ok(placed)
            }
            Err(err) => {
                metrics::counter!("checkout_failed_total").increment(1);
                if !log.is_empty() {
                    tracing::warn!(
                        %order_no,
                        error = %err,
                        reserved = log.len(),
                        "checkout failed, compensating"
                    );
                    self.compensate(user_id, &log).await;
                } else {
                    tracing::info!(%order_no, error = %err, "checkout rejected");
                }
                Err(err)
            }
        }
    }

    async fn place(
        &self,
        user_id: UserId,
        shipping_id: ShippingId,
        order_no: OrderNo,
        now: DateTime<Utc>,
        log: &mut CompensationLog,
    ) -> Result<PlacedOrder> {
        let (shipping, reserved) = tokio::join!(
            self.find_address(user_id, shipping_id),
            self.reservation.reserve(user_id, order_no, now, log),
        );
        let shipping = shipping?;
        let lines = reserved?;

        let order = self
            .assembler
            .assemble(order_no, user_id, &shipping, &lines, now)?;
        self.orders.insert(&order, &lines).await?;

        Ok(PlacedOrder {
            order,
            lines,
            shipping,
        })
    }

    async fn find_address(&self, user_id: UserId, shipping_id: ShippingId) -> Result<Shipping> {
        self.addresses
            .find_by_id_and_user(shipping_id, user_id)
            .await?
            .ok_or_else(|| BusinessError::AddressNotExist.into())
    }

    /// Undoes reserved lines newest first. Failures are logged and counted
    /// but never replace the checkout's own error.
    async fn compensate(&self, user_id: UserId, log: &CompensationLog) {
        for entry in log.undo_order() {
            metrics::counter!("checkout_compensations_total").increment(1);

            if let Err(err) = self.restock(entry).await {
                metrics::counter!("checkout_compensation_failures_total").increment(1);
                tracing::error!(
                    product_id = %entry.product_id,
                    units = entry.units,
                    error = %err,
                    "failed to restore stock"
                );
            }

            if entry.drained
                && let Err(err) = self.carts.restore(user_id, &entry.cart_line).await
            {
                metrics::counter!("checkout_compensation_failures_total").increment(1);
                tracing::error!(
                    product_id = %entry.product_id,
                    error = %err,
                    "failed to restore cart line"
                );
            }
        }
    }

    async fn restock(&self, entry: &ReservedLine) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(mut product) = self.catalog.find_by_id(entry.product_id).await? else {
                return Err(BusinessError::ProductNotExist.into());
            };
            product.stock = product.stock.saturating_add(entry.units);

            match self.catalog.save(&product).await {
                Ok(_) => return Ok(()),
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < RESTOCK_ATTEMPTS => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::OrderNumbers;
    use crate::policy::StockDecrementPolicy;
    use common::ProductId;
    use domain::{
        DomainError, InMemoryAddressBook, InMemoryCartStore, InMemoryCatalog,
        InMemoryOrderRepository, Money, OrderStatus, Product,
    };

    const USER: UserId = UserId::new(1);
    const HOME: ShippingId = ShippingId::new(10);

    struct FixedNumber(i64);

    impl OrderNumbers for FixedNumber {
        fn next(&self, _now: DateTime<Utc>) -> OrderNo {
            OrderNo::new(self.0)
        }
    }

    struct Fixture {
        coordinator: CheckoutCoordinator,
        carts: Arc<CartService>,
        catalog: InMemoryCatalog,
        orders: InMemoryOrderRepository,
    }

    async fn fixture(numbers: impl OrderNumbers + 'static) -> Fixture {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert(Product::new(ProductId::new(7), "Widget", Money::from_cents(1000), 5))
            .await;
        catalog
            .insert(Product::new(ProductId::new(8), "Gadget", Money::from_cents(250), 3))
            .await;
        let book = InMemoryAddressBook::new();
        book.insert(Shipping::new(HOME, USER, "Ada", "1 Main St")).await;
        let orders = InMemoryOrderRepository::new();

        let carts = Arc::new(CartService::new(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(catalog.clone()),
        ));
        let reservation = InventoryReservation::new(
            carts.clone(),
            Arc::new(catalog.clone()),
            StockDecrementPolicy::default(),
        );
        let coordinator = CheckoutCoordinator::new(
            reservation,
            OrderAssembler::new(numbers),
            carts.clone(),
            Arc::new(catalog.clone()),
            Arc::new(book),
            Arc::new(orders.clone()),
        );

        Fixture {
            coordinator,
            carts,
            catalog,
            orders,
        }
    }

    #[tokio::test]
    async fn test_checkout_persists_order() {
        let f = fixture(FixedNumber(42)).await;
        f.carts.add(USER, ProductId::new(7), 2, true).await.unwrap();

        let placed = f.coordinator.checkout(USER, HOME).await.unwrap();

        assert_eq!(placed.order.order_no(), OrderNo::new(42));
        assert_eq!(placed.order.status(), OrderStatus::NoPay);
        let stored = f.orders.find_by_order_no(OrderNo::new(42)).await.unwrap();
        assert_eq!(stored, Some(placed.order.clone()));

        let view = placed.into_view();
        assert_eq!(view.receiver_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_unknown_address_restores_cart_and_stock() {
        let f = fixture(FixedNumber(42)).await;
        f.carts.add(USER, ProductId::new(7), 2, true).await.unwrap();
        f.carts.add(USER, ProductId::new(8), 1, true).await.unwrap();
        let before = f.carts.list(USER).await.unwrap();

        let err = f
            .coordinator
            .checkout(USER, ShippingId::new(999))
            .await
            .unwrap_err();

        assert!(err.is(&BusinessError::AddressNotExist));
        assert_eq!(f.catalog.stock_of(ProductId::new(7)).await, Some(5));
        assert_eq!(f.catalog.stock_of(ProductId::new(8)).await, Some(3));
        assert_eq!(f.carts.list(USER).await.unwrap(), before);
        assert!(f.orders.is_empty().await);
    }

    #[tokio::test]
    async fn test_someone_elses_address_is_not_found() {
        let f = fixture(FixedNumber(42)).await;
        f.carts.add(USER, ProductId::new(7), 1, true).await.unwrap();

        let err = f
            .coordinator
            .checkout(UserId::new(2), HOME)
            .await
            .unwrap_err();

        // The other user's cart is empty, so both lookups fail; the address
        // error wins.
        assert!(err.is(&BusinessError::AddressNotExist));
        assert_eq!(f.catalog.stock_of(ProductId::new(7)).await, Some(5));
    }

    #[tokio::test]
    async fn test_duplicate_order_no_compensates() {
        let f = fixture(FixedNumber(42)).await;
        f.carts.add(USER, ProductId::new(7), 1, true).await.unwrap();
        f.coordinator.checkout(USER, HOME).await.unwrap();
        assert_eq!(f.catalog.stock_of(ProductId::new(7)).await, Some(4));

        f.carts.add(USER, ProductId::new(8), 2, true).await.unwrap();
        let err = f.coordinator.checkout(USER, HOME).await.unwrap_err();

        assert!(matches!(err, DomainError::Store(StoreError::Duplicate { .. })));
        assert_eq!(f.catalog.stock_of(ProductId::new(8)).await, Some(3));
        let cart = f.carts.list(USER).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(f.orders.len().await, 1);
    }
}
