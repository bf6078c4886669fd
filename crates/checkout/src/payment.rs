//! Payment completion relay: applies payment-gateway notifications to
//! orders.

use std::sync::Arc;

use common::OrderNo;
use domain::{BusinessError, Order, OrderService, Result};
use serde::{Deserialize, Serialize};

/// Platform status reported for a successful payment.
pub const PLATFORM_SUCCESS: &str = "SUCCESS";

/// A notification pushed by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub order_no: OrderNo,
    pub platform_status: String,
}

impl PaymentNotification {
    pub fn new(order_no: OrderNo, platform_status: impl Into<String>) -> Self {
        Self {
            order_no,
            platform_status: platform_status.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.platform_status == PLATFORM_SUCCESS
    }
}

/// What happened to a notification.
///
/// Every outcome is acknowledged to the gateway; only the logging differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The order moved to paid.
    Applied,
    /// The order was no longer unpaid, typically a gateway retry.
    AlreadyHandled,
    /// No order with that number.
    UnknownOrder,
    /// The notification did not report a successful payment.
    Ignored,
    /// Storage failed while applying the transition.
    Failed,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Applied => "applied",
            RelayOutcome::AlreadyHandled => "already_handled",
            RelayOutcome::UnknownOrder => "unknown_order",
            RelayOutcome::Ignored => "ignored",
            RelayOutcome::Failed => "failed",
        }
    }
}

/// Drives the paid transition from payment notifications.
pub struct PaymentCompletionRelay {
    orders: Arc<OrderService>,
}

impl PaymentCompletionRelay {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }

    /// Marks the order paid.
    ///
    /// A repeat call fails with `ORDER_STATUS_ERROR` and changes nothing.
    pub async fn on_payment_succeeded(&self, order_no: OrderNo) -> Result<Order> {
        self.orders.mark_paid(order_no).await
    }

    /// Handles a notification and classifies the result.
    #[tracing::instrument(skip(self), fields(order_no = %notification.order_no))]
    pub async fn handle(&self, notification: &PaymentNotification) -> RelayOutcome {
        let outcome = if !notification.is_success() {
            tracing::debug!(
                status = %notification.platform_status,
                "ignoring non-success notification"
            );
            RelayOutcome::Ignored
        } else {
            match self.on_payment_succeeded(notification.order_no).await {
                Ok(_) => RelayOutcome::Applied,
                Err(err) => match err.business() {
                    Some(BusinessError::OrderStatusError) => {
                        tracing::warn!("repeat payment notification, order already handled");
                        RelayOutcome::AlreadyHandled
                    }
                    Some(BusinessError::OrderNotExist) => {
                        tracing::warn!("payment notification for unknown order");
                        RelayOutcome::UnknownOrder
                    }
                    _ => {
                        tracing::error!(error = %err, "failed to apply payment notification");
                        RelayOutcome::Failed
                    }
                },
            }
        };

        metrics::counter!("payment_notifications_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{ProductId, ShippingId, UserId};
    use domain::{
        InMemoryAddressBook, InMemoryOrderRepository, Money, OrderLine, OrderRepository,
        OrderStatus, Product,
    };

    async fn relay_with_order(no: i64) -> (PaymentCompletionRelay, InMemoryOrderRepository) {
        let repo = InMemoryOrderRepository::new();
        let now = Utc::now();
        let product = Product::new(ProductId::new(7), "Widget", Money::from_cents(1000), 5);
        let lines = vec![OrderLine::snapshot(OrderNo::new(no), UserId::new(1), &product, 1, now)];
        let order = Order::place(
            OrderNo::new(no),
            UserId::new(1),
            ShippingId::new(1),
            &lines,
            now,
        )
        .unwrap();
        repo.insert(&order, &lines).await.unwrap();

        let service = OrderService::new(Arc::new(repo.clone()), Arc::new(InMemoryAddressBook::new()));
        (PaymentCompletionRelay::new(Arc::new(service)), repo)
    }

    #[tokio::test]
    async fn test_repeat_notification_is_already_handled() {
        let (relay, repo) = relay_with_order(5).await;
        let notification = PaymentNotification::new(OrderNo::new(5), PLATFORM_SUCCESS);

        assert_eq!(relay.handle(&notification).await, RelayOutcome::Applied);
        let paid_at = repo
            .find_by_order_no(OrderNo::new(5))
            .await
            .unwrap()
            .unwrap()
            .payment_time();

        assert_eq!(relay.handle(&notification).await, RelayOutcome::AlreadyHandled);
        let stored = repo.find_by_order_no(OrderNo::new(5)).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Paid);
        assert_eq!(stored.payment_time(), paid_at);
    }

    #[tokio::test]
    async fn test_non_success_status_is_ignored() {
        let (relay, repo) = relay_with_order(5).await;

        let outcome = relay
            .handle(&PaymentNotification::new(OrderNo::new(5), "NOTPAY"))
            .await;

        assert_eq!(outcome, RelayOutcome::Ignored);
        let stored = repo.find_by_order_no(OrderNo::new(5)).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::NoPay);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let (relay, _) = relay_with_order(5).await;

        let outcome = relay
            .handle(&PaymentNotification::new(OrderNo::new(6), PLATFORM_SUCCESS))
            .await;
        assert_eq!(outcome, RelayOutcome::UnknownOrder);

        let err = relay.on_payment_succeeded(OrderNo::new(6)).await.unwrap_err();
        assert!(err.is(&BusinessError::OrderNotExist));
    }

    #[test]
    fn test_notification_wire_format() {
        let json = r#"{"orderNo":1700000000000123,"platformStatus":"SUCCESS","payAmount":"0.01"}"#;
        let notification: PaymentNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.order_no, OrderNo::new(1_700_000_000_000_123));
        assert!(notification.is_success());
    }
}
