//! Term dictionary handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::web::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::web::state::SharedState;
use crate::web::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    pub source_text: String,
    pub target_text: String,
}

pub async fn create_entry_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CreateEntryRequest>,
) -> Response {
    if req.source_text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "source_text must not be empty");
    }
    let st = state.lock().await;
    match st
        .storage
        .create_dictionary_entry(&req.source_text, &req.target_text)
    {
        Ok(entry) => (StatusCode::CREATED, axum::Json(entry)).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
}

pub async fn list_entries_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Response {
    let skip = params.skip.unwrap_or(0) as usize;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT) as usize;

    let st = state.lock().await;
    match st.storage.list_dictionary_entries() {
        Ok(entries) => {
            let page: Vec<_> = entries.into_iter().skip(skip).take(limit).collect();
            (StatusCode::OK, axum::Json(page)).into_response()
        }
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct UpdateEntryRequest {
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub target_text: Option<String>,
}

pub async fn update_entry_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(req): axum::Json<UpdateEntryRequest>,
) -> Response {
    let st = state.lock().await;
    match st.storage.update_dictionary_entry(
        id,
        req.source_text.as_deref(),
        req.target_text.as_deref(),
    ) {
        Ok(Some(entry)) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("dictionary entry {id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_entry_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_dictionary_entry(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("dictionary entry {id} not found")),
        Err(e) => storage_error(e),
    }
}
