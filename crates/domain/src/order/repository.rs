//! Order storage port and its in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderNo, UserId};
use tokio::sync::RwLock;

use super::{Order, OrderLine, OrderStatus};
use crate::error::StoreError;

/// Storage port for orders and their lines.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists an order together with its lines.
    ///
    /// Either everything is written or nothing is. Returns
    /// `StoreError::Duplicate` if the order number is already taken.
    async fn insert(&self, order: &Order, lines: &[OrderLine]) -> Result<(), StoreError>;

    /// Loads an order by number.
    async fn find_by_order_no(&self, order_no: OrderNo) -> Result<Option<Order>, StoreError>;

    /// Loads every order of a user in creation order.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Loads the lines of an order.
    async fn lines_for(&self, order_no: OrderNo) -> Result<Vec<OrderLine>, StoreError>;

    /// Writes the order's status and timestamps if the stored status still
    /// equals `expected`.
    ///
    /// Returns `false` when a concurrent transition got there first.
    async fn update_status(&self, order: &Order, expected: OrderStatus)
    -> Result<bool, StoreError>;
}

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderNo, Order>,
    by_user: HashMap<UserId, Vec<OrderNo>>,
    lines: HashMap<OrderNo, Vec<OrderLine>>,
}

/// In-memory order repository for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn len(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns true if no orders are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order, lines: &[OrderLine]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let order_no = order.order_no();
        if tables.orders.contains_key(&order_no) {
            return Err(StoreError::Duplicate {
                entity: "order",
                id: order_no.to_string(),
            });
        }

        tables.orders.insert(order_no, order.clone());
        tables
            .by_user
            .entry(order.user_id())
            .or_default()
            .push(order_no);
        tables.lines.insert(order_no, lines.to_vec());
        Ok(())
    }

    async fn find_by_order_no(&self, order_no: OrderNo) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.read().await.orders.get(&order_no).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        let Some(numbers) = tables.by_user.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(numbers
            .iter()
            .filter_map(|no| tables.orders.get(no).cloned())
            .collect())
    }

    async fn lines_for(&self, order_no: OrderNo) -> Result<Vec<OrderLine>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .lines
            .get(&order_no)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&order.order_no()) {
            Some(stored) if stored.status() == expected => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
