//! Shared utility functions for the web layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::assembler::AssembleError;
use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, axum::Json(body)).into_response()
}

pub fn storage_error(e: StorageError) -> Response {
    match e {
        StorageError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        StorageError::AlreadyExists(_) => api_error(StatusCode::CONFLICT, e.to_string()),
        StorageError::Sqlite(_) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub fn assemble_error(e: AssembleError) -> Response {
    match e {
        // Nothing to retry until the owner configures a key.
        AssembleError::MissingApiKey => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        AssembleError::ConversationNotFound(_) | AssembleError::MessageNotFound(_) => {
            api_error(StatusCode::NOT_FOUND, e.to_string())
        }
        AssembleError::Storage(inner) => storage_error(inner),
    }
}

/// All provider failures surface as 503: the backend itself is fine, the
/// upstream call is not.
pub fn gateway_error(e: GatewayError) -> Response {
    api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}
