//! Translation and message handlers.
//!
//! The translate and edit flows share the same shape: assemble the request
//! under the lock, release the lock for the provider round trip, then take
//! the lock again to persist.  A gateway failure therefore leaves no message
//! row and no `updated_at` touch.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::assembler;
use crate::tlog;
use crate::web::state::SharedState;
use crate::web::utils::{api_error, assemble_error, gateway_error, storage_error};

#[derive(Deserialize)]
pub struct TranslateRequest {
    pub text_to_translate: String,
    pub target_language: String,
}

/// Translate new input inside a conversation and persist the resulting pair.
pub async fn translate_handler(
    State(state): State<SharedState>,
    Path(conversation_id): Path<i64>,
    axum::Json(req): axum::Json<TranslateRequest>,
) -> Response {
    if req.text_to_translate.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "text_to_translate must not be empty");
    }
    if req.target_language.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "target_language must not be empty");
    }

    let (gateway, prepared) = {
        let st = state.lock().await;
        let prepared = match assembler::prepare_translation(
            &st.storage,
            conversation_id,
            &req.text_to_translate,
            req.target_language.trim(),
        ) {
            Ok(prepared) => prepared,
            Err(e) => return assemble_error(e),
        };
        (st.gateway.clone(), prepared)
    };

    let translated = match gateway.translate(&prepared.api_key, &prepared.request).await {
        Ok(text) => text,
        Err(e) => {
            tlog!("translation failed for conversation {conversation_id}: {e}");
            return gateway_error(e);
        }
    };

    let st = state.lock().await;
    match st
        .storage
        .create_message(conversation_id, &req.text_to_translate, &translated)
    {
        Ok(message) => (StatusCode::CREATED, axum::Json(message)).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct EditMessageRequest {
    pub original_text: String,
}

/// Edit a message: re-derive its translation from the new text and overwrite
/// both fields on the same row.
pub async fn edit_message_handler(
    State(state): State<SharedState>,
    Path(message_id): Path<i64>,
    axum::Json(req): axum::Json<EditMessageRequest>,
) -> Response {
    if req.original_text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "original_text must not be empty");
    }

    let (gateway, prepared) = {
        let st = state.lock().await;
        match assembler::prepare_edit(&st.storage, message_id, &req.original_text) {
            Ok((_message, prepared)) => (st.gateway.clone(), prepared),
            Err(e) => return assemble_error(e),
        }
    };

    let translated = match gateway.translate(&prepared.api_key, &prepared.request).await {
        Ok(text) => text,
        Err(e) => {
            tlog!("edit re-translation failed for message {message_id}: {e}");
            return gateway_error(e);
        }
    };

    let st = state.lock().await;
    match st
        .storage
        .update_message(message_id, &req.original_text, &translated)
    {
        Ok(Some(message)) => (StatusCode::OK, axum::Json(message)).into_response(),
        // Deleted between prepare and persist.
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("message {message_id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_message_handler(
    State(state): State<SharedState>,
    Path(message_id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_message(message_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("message {message_id} not found")),
        Err(e) => storage_error(e),
    }
}
