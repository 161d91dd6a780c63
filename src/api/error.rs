//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes. Response bodies carry a
//! fixed public message only; details go to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use thiserror::Error;

use crate::api::dto::ErrorResponse;
use crate::broadcast::{HubError, PayloadError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body is not a JSON object
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Body is empty or `null`
    #[error("No JSON data provided")]
    MissingPayload,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Hub is shutting down
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) | ApiError::MissingPayload => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller
    fn public_message(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "Invalid JSON format",
            ApiError::MissingPayload => "No JSON data provided",
            ApiError::ServiceUnavailable(_) => "Service unavailable",
            ApiError::Internal(_) | ApiError::Io(_) => "Internal server error",
        }
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Empty => ApiError::MissingPayload,
            other => ApiError::InvalidPayload(other.to_string()),
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Encode(e) => ApiError::Internal(e.to_string()),
            HubError::ShuttingDown => {
                ApiError::ServiceUnavailable("hub is shutting down".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        // Log the error
        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "Rejected request"
            );
        }

        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Turns a handler panic into the generic 500 response
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_payload_response() {
        let err = ApiError::from(PayloadError::NotAnObject("array"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await, r#"{"error":"Invalid JSON format"}"#);
    }

    #[tokio::test]
    async fn test_missing_payload_response() {
        let response = ApiError::from(PayloadError::Empty).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await, r#"{"error":"No JSON data provided"}"#);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("secret stack trace".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, r#"{"error":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn test_panic_maps_to_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, r#"{"error":"Internal server error"}"#);
    }

    #[test]
    fn test_shutting_down_maps_to_unavailable() {
        let err = ApiError::from(HubError::ShuttingDown);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
