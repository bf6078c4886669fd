//! API error types with envelope response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use domain::{BusinessError, DomainError};
use thiserror::Error;

use crate::response::{ApiResponse, ERROR};

/// API-level error type that maps to an error envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request could not be decoded.
    #[error("invalid request: {0}")]
    Rejected(String),

    /// The adapter itself failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the envelope status and message for this error.
    pub fn status_and_message(&self) -> (i32, String) {
        match self {
            ApiError::Domain(DomainError::Business(err)) => (err.code(), err.to_string()),
            ApiError::Domain(DomainError::Store(_)) | ApiError::Internal(_) => {
                (ERROR, "internal server error".to_string())
            }
            ApiError::Rejected(reason) => {
                let err = BusinessError::param(reason.clone());
                (err.code(), err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = self.status_and_message();
        if status == ERROR {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status, %msg, "request rejected");
        }
        ApiResponse::failure(status, msg).into_response()
    }
}

impl From<BusinessError> for ApiError {
    fn from(err: BusinessError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::StoreError;

    #[test]
    fn test_business_errors_keep_their_code() {
        let err = ApiError::from(BusinessError::OrderStatusError);
        let (status, msg) = err.status_and_message();
        assert_eq!(status, 14);
        assert_eq!(msg, BusinessError::OrderStatusError.to_string());
    }

    #[test]
    fn test_store_errors_are_generic() {
        let err = ApiError::from(DomainError::Store(StoreError::Unavailable(
            "connection refused".into(),
        )));
        let (status, msg) = err.status_and_message();
        assert_eq!(status, ERROR);
        assert!(!msg.contains("connection refused"));
    }

    #[test]
    fn test_rejections_are_param_errors() {
        let (status, _) = ApiError::Rejected("missing field".into()).status_and_message();
        assert_eq!(status, 4);
    }
}
