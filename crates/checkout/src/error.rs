//! Checkout error types.

use thiserror::Error;

/// Errors returned when handing a notification to the payment queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("Payment queue is full")]
    Full,

    /// The worker has stopped.
    #[error("Payment queue is closed")]
    Closed,
}
