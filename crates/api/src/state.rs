//! Shared application state and backend wiring.

use std::sync::Arc;

use checkout::{
    CheckoutCoordinator, InventoryReservation, OrderAssembler, PaymentCompletionRelay,
    PaymentQueue, StockDecrementPolicy, WorkerSummary,
};
use domain::{
    AddressBook, CartService, CartStore, Catalog, InMemoryAddressBook, InMemoryCartStore,
    InMemoryCatalog, InMemoryOrderRepository, OrderRepository, OrderService,
};
use store::PostgresStorage;
use tokio::task::JoinHandle;

use crate::session::SessionResolver;

/// The storage ports the application runs on.
#[derive(Clone)]
pub struct Backends {
    pub kind: &'static str,
    pub carts: Arc<dyn CartStore>,
    pub catalog: Arc<dyn Catalog>,
    pub addresses: Arc<dyn AddressBook>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Backends {
    /// Empty in-memory storage.
    pub fn in_memory() -> Self {
        Self {
            kind: "memory",
            carts: Arc::new(InMemoryCartStore::new()),
            catalog: Arc::new(InMemoryCatalog::new()),
            addresses: Arc::new(InMemoryAddressBook::new()),
            orders: Arc::new(InMemoryOrderRepository::new()),
        }
    }

    /// PostgreSQL storage sharing one pool.
    pub fn postgres(storage: &PostgresStorage) -> Self {
        Self {
            kind: "postgres",
            carts: Arc::new(storage.carts()),
            catalog: Arc::new(storage.catalog()),
            addresses: Arc::new(storage.addresses()),
            orders: Arc::new(storage.orders()),
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub storage: &'static str,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub checkout: CheckoutCoordinator,
    pub payments: PaymentQueue,
    pub sessions: Arc<dyn SessionResolver>,
}

impl AppState {
    /// Wires the services over `backends` and starts the payment worker.
    ///
    /// The worker stops once the returned state, and every clone of its
    /// payment queue, has been dropped.
    pub fn build(
        backends: Backends,
        sessions: Arc<dyn SessionResolver>,
        policy: StockDecrementPolicy,
        payment_queue_capacity: usize,
    ) -> (Arc<Self>, JoinHandle<WorkerSummary>) {
        let carts = Arc::new(CartService::new(
            backends.carts.clone(),
            backends.catalog.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            backends.orders.clone(),
            backends.addresses.clone(),
        ));
        let checkout = CheckoutCoordinator::new(
            InventoryReservation::new(carts.clone(), backends.catalog.clone(), policy),
            OrderAssembler::default(),
            carts.clone(),
            backends.catalog,
            backends.addresses,
            backends.orders,
        );
        let relay = Arc::new(PaymentCompletionRelay::new(orders.clone()));
        let (payments, worker) = PaymentQueue::start(relay, payment_queue_capacity);

        tracing::info!(storage = backends.kind, %policy, "application state ready");

        let state = Arc::new(Self {
            storage: backends.kind,
            carts,
            orders,
            checkout,
            payments,
            sessions,
        });
        (state, worker)
    }
}
