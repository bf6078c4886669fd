//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Transitions owned by the core:
/// ```text
/// NoPay ──┬──► Paid ──► Shipped ──► TradeSuccess ──► TradeClose
///         └──► Canceled
/// ```
/// Only `NoPay → Canceled` and `NoPay → Paid` are driven here; the later
/// fulfillment states exist to bound the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Cancelled before payment (terminal state).
    Canceled,

    /// Created and awaiting payment.
    #[default]
    NoPay,

    /// Payment confirmed by the payment gateway.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Delivered and accepted.
    TradeSuccess,

    /// Closed after fulfillment (terminal state).
    TradeClose,
}

impl OrderStatus {
    /// Returns the persisted status code.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::Canceled => 0,
            OrderStatus::NoPay => 10,
            OrderStatus::Paid => 20,
            OrderStatus::Shipped => 40,
            OrderStatus::TradeSuccess => 50,
            OrderStatus::TradeClose => 60,
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Canceled),
            10 => Some(OrderStatus::NoPay),
            20 => Some(OrderStatus::Paid),
            40 => Some(OrderStatus::Shipped),
            50 => Some(OrderStatus::TradeSuccess),
            60 => Some(OrderStatus::TradeClose),
            _ => None,
        }
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::NoPay)
    }

    /// Returns true if the order can be marked paid in this status.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, OrderStatus::NoPay)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::NoPay => "NO_PAY",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::TradeSuccess => "TRADE_SUCCESS",
            OrderStatus::TradeClose => "TRADE_CLOSE",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 6] = [
        OrderStatus::Canceled,
        OrderStatus::NoPay,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::TradeSuccess,
        OrderStatus::TradeClose,
    ];

    #[test]
    fn test_default_status_is_no_pay() {
        assert_eq!(OrderStatus::default(), OrderStatus::NoPay);
    }

    #[test]
    fn test_only_no_pay_can_cancel_or_be_paid() {
        for status in ALL {
            assert_eq!(status.can_cancel(), status == OrderStatus::NoPay);
            assert_eq!(status.can_mark_paid(), status == OrderStatus::NoPay);
        }
    }

    #[test]
    fn test_codes_round_trip() {
        let codes: Vec<i16> = ALL.iter().map(OrderStatus::code).collect();
        assert_eq!(codes, vec![0, 10, 20, 40, 50, 60]);
        for status in ALL {
            assert_eq!(OrderStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(OrderStatus::from_code(30), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::NoPay.to_string(), "NO_PAY");
        assert_eq!(OrderStatus::Canceled.to_string(), "CANCELED");
    }
}
