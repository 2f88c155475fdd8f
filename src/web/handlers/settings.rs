//! Settings endpoints: a raw key/value surface over the settings table.
//!
//! Known keys get typed treatment elsewhere ([`crate::settings`]); this
//! surface stays generic so the UI can store keys the backend has no
//! opinion about.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::web::state::SharedState;
use crate::web::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct UpsertSettingRequest {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

pub async fn upsert_setting_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<UpsertSettingRequest>,
) -> Response {
    if req.key.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "key must not be empty");
    }
    let st = state.lock().await;
    match st.storage.upsert_setting(&req.key, req.value.as_deref()) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({ "key": req.key, "value": req.value })),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

/// An absent key is not an error; the client sees `value: null` and applies
/// its own default.
pub async fn get_setting_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.storage.get_setting(&key) {
        Ok(value) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({ "key": key, "value": value })),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}
