//! Bounded queue feeding payment notifications to a single worker task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::QueueError;
use crate::payment::{PaymentCompletionRelay, PaymentNotification, RelayOutcome};

/// Counts of what the worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: u64,
    pub applied: u64,
    pub failed: u64,
}

/// Sending half of the payment queue.
///
/// The worker stops once every clone of the queue has been dropped and the
/// remaining notifications are drained.
#[derive(Clone)]
pub struct PaymentQueue {
    sender: mpsc::Sender<PaymentNotification>,
}

impl PaymentQueue {
    /// Spawns the worker and returns the queue with the worker's handle.
    pub fn start(
        relay: Arc<PaymentCompletionRelay>,
        capacity: usize,
    ) -> (Self, JoinHandle<WorkerSummary>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(relay, receiver));
        (Self { sender }, worker)
    }

    /// Enqueues a notification without waiting.
    pub fn enqueue(&self, notification: PaymentNotification) -> Result<(), QueueError> {
        self.sender.try_send(notification).map_err(|err| match err {
            mpsc::error::TrySendError::Full(n) => {
                tracing::warn!(order_no = %n.order_no, "payment queue full");
                QueueError::Full
            }
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

async fn run_worker(
    relay: Arc<PaymentCompletionRelay>,
    mut receiver: mpsc::Receiver<PaymentNotification>,
) -> WorkerSummary {
    let mut summary = WorkerSummary::default();
    tracing::info!("payment worker started");

    while let Some(notification) = receiver.recv().await {
        summary.processed += 1;
        match relay.handle(&notification).await {
            RelayOutcome::Applied => summary.applied += 1,
            RelayOutcome::Failed => summary.failed += 1,
            _ => {}
        }
    }

    tracing::info!(
        processed = summary.processed,
        applied = summary.applied,
        failed = summary.failed,
        "payment worker stopped"
    );
    summary
}
