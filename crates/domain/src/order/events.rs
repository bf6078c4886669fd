//! Status transitions recorded against an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// A status transition produced by the order's command methods.
///
/// Command methods validate and return a transition; [`super::Order::apply`]
/// folds it into the order without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    /// The owner cancelled an unpaid order.
    Canceled { close_time: DateTime<Utc> },

    /// The payment gateway confirmed payment.
    Paid { payment_time: DateTime<Utc> },
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Canceled { .. } => "OrderCanceled",
            OrderEvent::Paid { .. } => "OrderPaid",
        }
    }

    /// Returns the status the order is in after this transition.
    pub fn target_status(&self) -> OrderStatus {
        match self {
            OrderEvent::Canceled { .. } => OrderStatus::Canceled,
            OrderEvent::Paid { .. } => OrderStatus::Paid,
        }
    }

    /// Returns when the transition happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Canceled { close_time } => *close_time,
            OrderEvent::Paid { payment_time } => *payment_time,
        }
    }
}
