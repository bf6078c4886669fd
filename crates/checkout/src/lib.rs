//! Checkout and payment completion for the storefront core.
//!
//! Checkout runs as a saga:
//! 1. Look up the shipping address and reserve stock for the selected cart
//!    lines, concurrently
//! 2. Assemble the order from the reserved line snapshots
//! 3. Persist the order and its lines together
//!
//! If any step fails after stock was taken, reserved lines are undone in
//! reverse order. Payment notifications are applied through a bounded
//! queue drained by a single worker.

pub mod assembler;
pub mod compensation;
pub mod coordinator;
pub mod error;
pub mod payment;
pub mod policy;
pub mod queue;
pub mod reservation;

pub use assembler::{OrderAssembler, OrderNumbers, TimestampOrderNumbers};
pub use compensation::{CompensationLog, ReservedLine};
pub use coordinator::{CheckoutCoordinator, PlacedOrder};
pub use error::QueueError;
pub use payment::{PLATFORM_SUCCESS, PaymentCompletionRelay, PaymentNotification, RelayOutcome};
pub use policy::StockDecrementPolicy;
pub use queue::{PaymentQueue, WorkerSummary};
pub use reservation::InventoryReservation;
