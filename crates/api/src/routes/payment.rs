//! Inbound payment notifications.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use checkout::{PaymentNotification, QueueError};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /payNotify: queues the notification for the payment worker.
///
/// Acknowledged as soon as it is queued; the worker applies it. A full or
/// closed queue is reported so the gateway retries later.
#[tracing::instrument(skip(state, body))]
pub async fn notify(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PaymentNotification>, JsonRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let Json(notification) = body?;
    let order_no = notification.order_no;

    state.payments.enqueue(notification).map_err(|err| {
        let reason = match err {
            QueueError::Full => "full",
            QueueError::Closed => "closed",
        };
        metrics::counter!("payment_notifications_rejected_total", "reason" => reason).increment(1);
        ApiError::Internal(err.to_string())
    })?;

    tracing::debug!(%order_no, "payment notification queued");
    Ok(ApiResponse::message("notification received"))
}
