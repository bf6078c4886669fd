//! Order service: owner-scoped reads and the state machine transitions.

use std::sync::Arc;

use chrono::Utc;
use common::{OrderNo, UserId};

use super::{Order, OrderEvent, OrderRepository, OrderView};
use crate::address::AddressBook;
use crate::error::{BusinessError, Result};
use crate::value_objects::Page;

/// Service for reading and transitioning orders.
///
/// Every user-facing lookup checks ownership; an order that belongs to
/// someone else is reported exactly like a missing one.
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    addresses: Arc<dyn AddressBook>,
}

impl OrderService {
    /// Creates an order service over the given repository and address book.
    pub fn new(orders: Arc<dyn OrderRepository>, addresses: Arc<dyn AddressBook>) -> Self {
        Self { orders, addresses }
    }

    /// Returns an order with its lines and shipping address.
    #[tracing::instrument(skip(self))]
    pub async fn detail(&self, user_id: UserId, order_no: OrderNo) -> Result<OrderView> {
        let order = self.owned(user_id, order_no).await?;
        self.view_of(&order).await
    }

    /// Returns one page of the user's orders in creation order.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: UserId,
        page_num: u32,
        page_size: u32,
    ) -> Result<Page<OrderView>> {
        if page_num < 1 || page_size < 1 {
            return Err(BusinessError::param("pageNum and pageSize must be at least 1").into());
        }

        let orders = self.orders.find_by_user(user_id).await?;
        let page = Page::slice(orders, page_num, page_size);

        let mut content = Vec::with_capacity(page.current);
        for order in &page.content {
            content.push(self.view_of(order).await?);
        }

        Ok(Page {
            page_num: page.page_num,
            page_size: page.page_size,
            current: page.current,
            content,
        })
    }

    /// Cancels an unpaid order on behalf of its owner.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_no: OrderNo) -> Result<Order> {
        let mut order = self.owned(user_id, order_no).await?;
        let event = order.cancel(Utc::now())?;
        self.commit(&mut order, event).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_no, "order cancelled");
        Ok(order)
    }

    /// Marks an unpaid order as paid.
    ///
    /// A second call for the same order fails with `ORDER_STATUS_ERROR` and
    /// leaves the recorded payment time untouched.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_no: OrderNo) -> Result<Order> {
        let mut order = self
            .orders
            .find_by_order_no(order_no)
            .await?
            .ok_or(BusinessError::OrderNotExist)?;
        let event = order.mark_paid(Utc::now())?;
        self.commit(&mut order, event).await?;

        metrics::counter!("orders_paid_total").increment(1);
        tracing::info!(%order_no, "order paid");
        Ok(order)
    }

    async fn owned(&self, user_id: UserId, order_no: OrderNo) -> Result<Order> {
        self.orders
            .find_by_order_no(order_no)
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| BusinessError::OrderNotExist.into())
    }

    /// Applies `event` and persists it, provided nobody moved the order
    /// out of its current status in between.
    async fn commit(&self, order: &mut Order, event: OrderEvent) -> Result<()> {
        let expected = order.status();
        order.apply(event);
        if !self.orders.update_status(order, expected).await? {
            tracing::warn!(
                order_no = %order.order_no(),
                event = event.event_type(),
                "lost a concurrent status transition"
            );
            return Err(BusinessError::OrderStatusError.into());
        }
        tracing::debug!(
            order_no = %order.order_no(),
            event = event.event_type(),
            status = %order.status(),
            "status transition committed"
        );
        Ok(())
    }

    async fn view_of(&self, order: &Order) -> Result<OrderView> {
        let lines = self.orders.lines_for(order.order_no()).await?;
        let shipping = self.addresses.find_by_id(order.shipping_id()).await?;
        Ok(OrderView::new(order, lines, shipping))
    }
}
