//! Single-tenant profile endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::storage::ProfileRow;
use crate::web::state::SharedState;
use crate::web::utils::storage_error;

/// Reading a never-written profile returns the empty defaults, not a 404.
pub async fn get_profile_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    match st.storage.get_profile() {
        Ok(profile) => {
            (StatusCode::OK, axum::Json(profile.unwrap_or_default())).into_response()
        }
        Err(e) => storage_error(e),
    }
}

pub async fn update_profile_handler(
    State(state): State<SharedState>,
    axum::Json(patch): axum::Json<ProfileRow>,
) -> Response {
    let st = state.lock().await;
    match st.storage.upsert_profile(&patch) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(e) => storage_error(e),
    }
}
