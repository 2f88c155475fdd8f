//! Note handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::web::state::SharedState;
use crate::web::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

pub async fn create_note_handler(
    State(state): State<SharedState>,
    Path(conversation_id): Path<i64>,
    axum::Json(req): axum::Json<NoteRequest>,
) -> Response {
    let st = state.lock().await;
    match st.storage.create_note(conversation_id, &req.content) {
        Ok(note) => (StatusCode::CREATED, axum::Json(note)).into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn list_notes_handler(
    State(state): State<SharedState>,
    Path(conversation_id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.list_notes(conversation_id) {
        Ok(notes) => (StatusCode::OK, axum::Json(notes)).into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn update_note_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(req): axum::Json<NoteRequest>,
) -> Response {
    let st = state.lock().await;
    match st.storage.update_note(id, &req.content) {
        Ok(Some(note)) => (StatusCode::OK, axum::Json(note)).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("note {id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_note_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_note(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("note {id} not found")),
        Err(e) => storage_error(e),
    }
}
