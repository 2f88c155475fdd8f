//! Conversation lifecycle handlers: create, list, detail, rename, archive,
//! per-conversation settings, export, delete.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::export;
use crate::settings::AppSettings;
use crate::storage::{now_millis, ConversationSettingsPatch};
use crate::tlog;
use crate::web::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::web::state::SharedState;
use crate::web::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub title: String,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

/// Create a conversation.  When the request carries no prompt, the
/// configured default prompt (if any) is copied in as the starting custom
/// prompt, so later edits to the prompt library never rewrite history.
pub async fn create_conversation_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CreateConversationRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "title must not be empty");
    }

    let st = state.lock().await;
    let custom_prompt = match req.custom_prompt {
        Some(prompt) => Some(prompt),
        None => {
            let seeded = AppSettings::load(&st.storage)
                .and_then(|s| s.default_prompt_content(&st.storage));
            match seeded {
                Ok(prompt) => prompt,
                Err(e) => return storage_error(e),
            }
        }
    };

    match st.storage.create_conversation(req.title.trim(), custom_prompt) {
        Ok(conv) => {
            tlog!("created conversation {} ({})", conv.id, conv.title);
            (StatusCode::CREATED, axum::Json(conv)).into_response()
        }
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
}

fn page(params: &ListQuery) -> (u32, u32) {
    let skip = params.skip.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    (skip, limit)
}

pub async fn list_conversations_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Response {
    list_by_archive_state(state, params, false).await
}

pub async fn list_archived_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Response {
    list_by_archive_state(state, params, true).await
}

async fn list_by_archive_state(state: SharedState, params: ListQuery, archived: bool) -> Response {
    let (skip, limit) = page(&params);
    let st = state.lock().await;
    match st.storage.list_conversations(archived, skip, limit) {
        Ok(conversations) => (StatusCode::OK, axum::Json(conversations)).into_response(),
        Err(e) => storage_error(e),
    }
}

/// Conversation detail: the row plus its full message and note history.
pub async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    let conv = match st.storage.get_conversation(id) {
        Ok(Some(conv)) => conv,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => return storage_error(e),
    };
    let messages = match st.storage.list_messages(id) {
        Ok(messages) => messages,
        Err(e) => return storage_error(e),
    };
    let notes = match st.storage.list_notes(id) {
        Ok(notes) => notes,
        Err(e) => return storage_error(e),
    };

    let mut body = match serde_json::to_value(&conv) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return api_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed"),
    };
    body.insert(
        "messages".to_string(),
        serde_json::json!(messages),
    );
    body.insert("notes".to_string(), serde_json::json!(notes));
    (StatusCode::OK, axum::Json(serde_json::Value::Object(body))).into_response()
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

pub async fn rename_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(req): axum::Json<RenameRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "title must not be empty");
    }
    let st = state.lock().await;
    match st.storage.rename_conversation(id, req.title.trim()) {
        Ok(true) => match st.storage.get_conversation(id) {
            Ok(Some(conv)) => (StatusCode::OK, axum::Json(conv)).into_response(),
            Ok(None) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
            Err(e) => storage_error(e),
        },
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => storage_error(e),
    }
}

/// The archive flag is required and must be a boolean; a missing or
/// mistyped field is a 400, never an implicit default.
pub async fn archive_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(req): axum::Json<serde_json::Value>,
) -> Response {
    let Some(is_archived) = req.get("is_archived").and_then(|v| v.as_bool()) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "is_archived must be present and a boolean",
        );
    };
    let st = state.lock().await;
    match st.storage.set_conversation_archived(id, is_archived) {
        Ok(true) => match st.storage.get_conversation(id) {
            Ok(Some(conv)) => (StatusCode::OK, axum::Json(conv)).into_response(),
            Ok(None) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
            Err(e) => storage_error(e),
        },
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn update_settings_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(patch): axum::Json<ConversationSettingsPatch>,
) -> Response {
    let st = state.lock().await;
    match st.storage.update_conversation_settings(id, &patch) {
        Ok(Some(conv)) => (StatusCode::OK, axum::Json(conv)).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_conversation(id) {
        Ok(true) => {
            tlog!("deleted conversation {id}");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => storage_error(e),
    }
}

/// Download the conversation as a plain-text transcript.
pub async fn export_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    let conv = match st.storage.get_conversation(id) {
        Ok(Some(conv)) => conv,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found")),
        Err(e) => return storage_error(e),
    };
    let messages = match st.storage.list_messages(id) {
        Ok(messages) => messages,
        Err(e) => return storage_error(e),
    };

    let transcript = export::render_transcript(&conv, &messages, now_millis());
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::export_filename(id)),
        ),
    ];
    (StatusCode::OK, headers, transcript).into_response()
}
