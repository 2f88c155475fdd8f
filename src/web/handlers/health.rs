//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::storage::StorageError;
use crate::web::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.lock().await;
    let (status, body) = health_body(
        state.db_path.display().to_string(),
        state.storage.count_conversations(),
    );
    (status, axum::Json(body))
}

/// A failing storage read must not report "ok"; it degrades the status and
/// carries the error.
fn health_body(
    db_path: String,
    count: Result<i64, StorageError>,
) -> (StatusCode, serde_json::Value) {
    match count {
        Ok(conversations) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "ok",
                "database": db_path,
                "conversations": conversations,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "degraded",
                "database": db_path,
                "error": e.to_string(),
            }),
        ),
    }
}
