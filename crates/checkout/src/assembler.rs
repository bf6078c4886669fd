//! Order assembly: order numbers and the order built from reserved lines.

use chrono::{DateTime, Utc};
use common::{OrderNo, UserId};
use domain::{BusinessError, Order, OrderLine, Shipping};
use rand::Rng;

/// Source of new order numbers.
pub trait OrderNumbers: Send + Sync {
    fn next(&self, now: DateTime<Utc>) -> OrderNo;
}

/// Order numbers made of the creation time in milliseconds followed by
/// three random digits.
///
/// Uniqueness is best-effort; a collision surfaces as a duplicate insert.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampOrderNumbers;

impl OrderNumbers for TimestampOrderNumbers {
    fn next(&self, now: DateTime<Utc>) -> OrderNo {
        let suffix: i64 = rand::thread_rng().gen_range(0..1000);
        OrderNo::new(now.timestamp_millis() * 1000 + suffix)
    }
}

/// Builds orders from reserved lines.
pub struct OrderAssembler {
    numbers: Box<dyn OrderNumbers>,
}

impl OrderAssembler {
    pub fn new(numbers: impl OrderNumbers + 'static) -> Self {
        Self {
            numbers: Box::new(numbers),
        }
    }

    /// Returns the number for the next order.
    pub fn next_order_no(&self, now: DateTime<Utc>) -> OrderNo {
        self.numbers.next(now)
    }

    /// Builds an unpaid, online-payment order with no postage.
    pub fn assemble(
        &self,
        order_no: OrderNo,
        user_id: UserId,
        shipping: &Shipping,
        lines: &[OrderLine],
        now: DateTime<Utc>,
    ) -> Result<Order, BusinessError> {
        Order::place(order_no, user_id, shipping.id, lines, now)
    }
}

impl Default for OrderAssembler {
    fn default() -> Self {
        Self::new(TimestampOrderNumbers)
    }
}
