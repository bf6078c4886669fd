//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{OrderNo, ProductId, ShippingId, UserId};
use domain::{
    AddressBook, CartLine, CartLineUpdate, CartStore, Catalog, CatalogExt, MAX_LINE_QUANTITY,
    Money, Order, OrderLine, OrderRepository, OrderStatus, Product, SaleStatus, Shipping,
    StoreError,
};
use serial_test::serial;
use store::PostgresStorage;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let storage = PostgresStorage::connect(&connection_string, 1)
                .await
                .unwrap();
            storage.run_migrations().await.unwrap();
            storage.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get fresh storage with its own pool and cleared tables
async fn get_test_storage() -> PostgresStorage {
    let info = get_container_info().await;

    let storage = PostgresStorage::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders, cart_hashes, shippings, products")
        .execute(storage.pool())
        .await
        .unwrap();

    storage
}

const USER: UserId = UserId::new(1);

fn widget() -> Product {
    Product::new(ProductId::new(7), "Widget", Money::from_cents(1000), 5)
        .with_details("A fine widget", "widget.png")
}

mod catalog {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn save_inserts_then_bumps_version() {
        let storage = get_test_storage().await;
        let catalog = storage.catalog();

        let stored = catalog.save(&widget()).await.unwrap();
        assert_eq!(stored.version, 1);

        let mut product = catalog.find_existing(ProductId::new(7)).await.unwrap();
        assert_eq!(product, stored);

        product.stock -= 1;
        let stored = catalog.save(&product).await.unwrap();
        assert_eq!(stored.version, 2);

        let reloaded = catalog.find_by_id(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 4);
        assert_eq!(reloaded.main_image, "widget.png");
    }

    #[tokio::test]
    #[serial]
    async fn stale_save_is_a_conflict() {
        let storage = get_test_storage().await;
        let catalog = storage.catalog();
        catalog.save(&widget()).await.unwrap();

        let first = catalog.find_existing(ProductId::new(7)).await.unwrap();
        let second = first.clone();

        catalog.save(&first).await.unwrap();
        let err = catalog.save(&second).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict {
                entity: "product",
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    #[serial]
    async fn sale_status_round_trips() {
        let storage = get_test_storage().await;
        let catalog = storage.catalog();
        catalog
            .save(&widget().with_status(SaleStatus::Deleted))
            .await
            .unwrap();

        let err = catalog.find_sellable(ProductId::new(7)).await.unwrap_err();
        assert_eq!(err.business().map(|e| e.code()), Some(7));
    }
}

mod carts {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn increment_upserts_and_keeps_selection() {
        let storage = get_test_storage().await;
        let carts = storage.carts();

        let line = carts.increment(USER, ProductId::new(7), 1, true).await.unwrap();
        assert_eq!(line, Some(CartLine::new(ProductId::new(7), 1, true)));

        let line = carts.increment(USER, ProductId::new(7), 2, false).await.unwrap();
        assert_eq!(line, Some(CartLine::new(ProductId::new(7), 3, true)));
    }

    #[tokio::test]
    #[serial]
    async fn concurrent_increments_are_not_lost() {
        let storage = get_test_storage().await;
        let carts = storage.carts();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let carts = carts.clone();
            handles.push(tokio::spawn(async move {
                carts.increment(USER, ProductId::new(7), 1, true).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let line = carts.line(USER, ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(line.quantity, 10);
    }

    #[tokio::test]
    #[serial]
    async fn modify_select_remove_and_restore() {
        let storage = get_test_storage().await;
        let carts = storage.carts();
        carts.increment(USER, ProductId::new(9), 1, false).await.unwrap();
        carts.increment(USER, ProductId::new(7), 1, false).await.unwrap();

        let updated = carts
            .modify(
                USER,
                ProductId::new(7),
                CartLineUpdate {
                    quantity: Some(4),
                    selected: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated, Some(CartLine::new(ProductId::new(7), 4, false)));

        let missing = carts
            .modify(USER, ProductId::new(8), CartLineUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());

        carts.set_all_selected(USER, true).await.unwrap();
        let lines = carts.lines(USER).await.unwrap();
        let ids: Vec<i64> = lines.iter().map(|l| l.product_id.get()).collect();
        assert_eq!(ids, vec![7, 9]);
        assert!(lines.iter().all(|l| l.selected));

        let removed = carts
            .remove(USER, &[ProductId::new(7), ProductId::new(99)])
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let restored = carts.restore(USER, &lines[0]).await.unwrap();
        assert_eq!(restored, lines[0]);
        assert_eq!(
            carts.line(USER, ProductId::new(7)).await.unwrap(),
            Some(lines[0])
        );
        assert!(carts.lines(UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn increment_never_exceeds_line_cap() {
        let storage = get_test_storage().await;
        let carts = storage.carts();

        let oversized = carts
            .increment(USER, ProductId::new(7), MAX_LINE_QUANTITY + 1, true)
            .await
            .unwrap();
        assert!(oversized.is_none());
        assert!(carts.lines(USER).await.unwrap().is_empty());

        carts
            .increment(USER, ProductId::new(7), MAX_LINE_QUANTITY - 1, true)
            .await
            .unwrap();
        let full = carts.increment(USER, ProductId::new(7), 1, true).await.unwrap();
        assert_eq!(full.map(|l| l.quantity), Some(MAX_LINE_QUANTITY));

        let rejected = carts.increment(USER, ProductId::new(7), 1, true).await.unwrap();
        assert!(rejected.is_none());
        let rejected = carts
            .increment(USER, ProductId::new(7), MAX_LINE_QUANTITY, true)
            .await
            .unwrap();
        assert!(rejected.is_none());

        let line = carts.line(USER, ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(line.quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    #[serial]
    async fn restore_merges_with_line_added_meanwhile() {
        let storage = get_test_storage().await;
        let carts = storage.carts();
        let drained = CartLine::new(ProductId::new(7), 2, true);

        // The customer re-adds the product while the drained line is away.
        carts.increment(USER, ProductId::new(7), 1, false).await.unwrap();

        let merged = carts.restore(USER, &drained).await.unwrap();
        assert_eq!(merged, CartLine::new(ProductId::new(7), 3, false));
        assert_eq!(
            carts.line(USER, ProductId::new(7)).await.unwrap(),
            Some(merged)
        );

        let capped = carts
            .restore(USER, &CartLine::new(ProductId::new(7), MAX_LINE_QUANTITY, true))
            .await
            .unwrap();
        assert_eq!(capped.quantity, MAX_LINE_QUANTITY);
    }
}

mod orders {
    use super::*;

    fn placed(no: i64) -> (Order, Vec<OrderLine>) {
        let now = Utc::now();
        let lines = vec![OrderLine::snapshot(OrderNo::new(no), USER, &widget(), 2, now)];
        let order = Order::place(OrderNo::new(no), USER, ShippingId::new(3), &lines, now).unwrap();
        (order, lines)
    }

    #[tokio::test]
    #[serial]
    async fn insert_and_read_back() {
        let storage = get_test_storage().await;
        let orders = storage.orders();
        let (order, lines) = placed(1001);

        orders.insert(&order, &lines).await.unwrap();

        let stored = orders
            .find_by_order_no(OrderNo::new(1001))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment(), Money::from_cents(2000));
        assert_eq!(stored.status(), OrderStatus::NoPay);

        let stored_lines = orders.lines_for(OrderNo::new(1001)).await.unwrap();
        assert_eq!(stored_lines.len(), 1);
        assert_eq!(stored_lines[0].product_name, "Widget");
        assert_eq!(stored_lines[0].line_total, Money::from_cents(2000));
    }

    #[tokio::test]
    #[serial]
    async fn duplicate_order_no_leaves_first_intact() {
        let storage = get_test_storage().await;
        let orders = storage.orders();
        let (order, lines) = placed(1001);

        orders.insert(&order, &lines).await.unwrap();
        let err = orders.insert(&order, &lines).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { entity: "order", .. }));

        assert_eq!(orders.lines_for(OrderNo::new(1001)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn find_by_user_in_creation_order() {
        let storage = get_test_storage().await;
        let orders = storage.orders();
        for no in [3003, 1001, 2002] {
            let (order, lines) = placed(no);
            orders.insert(&order, &lines).await.unwrap();
        }

        let numbers: Vec<i64> = orders
            .find_by_user(USER)
            .await
            .unwrap()
            .iter()
            .map(|o| o.order_no().get())
            .collect();
        assert_eq!(numbers, vec![3003, 1001, 2002]);
    }

    #[tokio::test]
    #[serial]
    async fn update_status_is_compare_and_set() {
        let storage = get_test_storage().await;
        let orders = storage.orders();
        let (mut order, lines) = placed(1001);
        orders.insert(&order, &lines).await.unwrap();

        let event = order.mark_paid(Utc::now()).unwrap();
        order.apply(event);

        assert!(orders.update_status(&order, OrderStatus::NoPay).await.unwrap());
        assert!(!orders.update_status(&order, OrderStatus::NoPay).await.unwrap());

        let stored = orders
            .find_by_order_no(OrderNo::new(1001))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), OrderStatus::Paid);
        assert!(stored.payment_time().is_some());
    }
}

mod addresses {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn lookup_is_scoped_to_owner() {
        let storage = get_test_storage().await;
        let addresses = storage.addresses();
        addresses
            .insert(&Shipping::new(ShippingId::new(3), USER, "Ada", "1 Main St"))
            .await
            .unwrap();

        let own = addresses
            .find_by_id_and_user(ShippingId::new(3), USER)
            .await
            .unwrap();
        assert_eq!(own.map(|s| s.receiver_name), Some("Ada".to_string()));

        let other = addresses
            .find_by_id_and_user(ShippingId::new(3), UserId::new(2))
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
