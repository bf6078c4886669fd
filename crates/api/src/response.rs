//! The `{status, msg, data}` envelope every endpoint answers with.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Status reported for a successful call.
pub const SUCCESS: i32 = 0;

/// Status reported for failures that are not business errors.
pub const ERROR: i32 = -1;

/// Response envelope.
///
/// Business outcomes, failures included, are delivered with HTTP 200; the
/// caller reads `status`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: SUCCESS,
            msg: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A successful response carrying only a message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            status: SUCCESS,
            msg: Some(msg.into()),
            data: None,
        }
    }

    /// A failed response.
    pub fn failure(status: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: Some(msg.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
