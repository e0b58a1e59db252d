//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Engine error, mapped by variant.
    Engine(EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Engine(err) => engine_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::InvalidQuantity { .. } | EngineError::EmptyCart | EngineError::Order(_) => {
            StatusCode::BAD_REQUEST
        }
        EngineError::ProductNotFound(_)
        | EngineError::OrderNotFound(_)
        | EngineError::ItemNotInCart(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidTransition { .. } | EngineError::OrderNotPayable { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::InsufficientStock { .. } | EngineError::ProductUnavailable(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Gateway(_) => StatusCode::BAD_GATEWAY,
        EngineError::Store(StoreError::DuplicateIntent(_)) => StatusCode::CONFLICT,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal server error");
    }
    (status, err.to_string())
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}
