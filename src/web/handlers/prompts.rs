//! Reusable prompt handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::web::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::web::state::SharedState;
use crate::web::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct CreatePromptRequest {
    pub title: String,
    pub content: String,
}

pub async fn create_prompt_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CreatePromptRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "title must not be empty");
    }
    let st = state.lock().await;
    match st.storage.create_prompt(&req.title, &req.content) {
        Ok(prompt) => (StatusCode::CREATED, axum::Json(prompt)).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
}

pub async fn list_prompts_handler(
    State(state): State<SharedState>,
    Query(params): Query<ListQuery>,
) -> Response {
    let skip = params.skip.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);

    let st = state.lock().await;
    match st.storage.list_prompts(skip, limit) {
        Ok(prompts) => (StatusCode::OK, axum::Json(prompts)).into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn get_prompt_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.get_prompt(id) {
        Ok(Some(prompt)) => (StatusCode::OK, axum::Json(prompt)).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("prompt {id} not found")),
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct UpdatePromptRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

pub async fn update_prompt_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    axum::Json(req): axum::Json<UpdatePromptRequest>,
) -> Response {
    let st = state.lock().await;
    match st
        .storage
        .update_prompt(id, req.title.as_deref(), req.content.as_deref())
    {
        Ok(Some(prompt)) => (StatusCode::OK, axum::Json(prompt)).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, format!("prompt {id} not found")),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_prompt_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_prompt(id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, format!("prompt {id} not found")),
        Err(e) => storage_error(e),
    }
}
