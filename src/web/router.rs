//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::web::config::MAX_AUDIO_UPLOAD_SIZE;
use crate::web::handlers;
use crate::web::state::SharedState;

/// Build the complete Axum router with all API routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health::health_handler))
        // Conversations API
        .route(
            "/api/conversations",
            get(handlers::conversations::list_conversations_handler)
                .post(handlers::conversations::create_conversation_handler),
        )
        .route(
            "/api/conversations/archived",
            get(handlers::conversations::list_archived_handler),
        )
        .route(
            "/api/conversations/:id",
            get(handlers::conversations::get_conversation_handler)
                .delete(handlers::conversations::delete_conversation_handler),
        )
        .route(
            "/api/conversations/:id/rename",
            patch(handlers::conversations::rename_conversation_handler),
        )
        .route(
            "/api/conversations/:id/archive",
            patch(handlers::conversations::archive_conversation_handler),
        )
        .route(
            "/api/conversations/:id/settings",
            patch(handlers::conversations::update_settings_handler),
        )
        .route(
            "/api/conversations/:id/export",
            get(handlers::conversations::export_conversation_handler),
        )
        // Translation
        .route(
            "/api/conversations/:id/translate",
            post(handlers::messages::translate_handler),
        )
        .route(
            "/api/messages/:id",
            patch(handlers::messages::edit_message_handler)
                .delete(handlers::messages::delete_message_handler),
        )
        // Notes API
        .route(
            "/api/conversations/:id/notes",
            get(handlers::notes::list_notes_handler).post(handlers::notes::create_note_handler),
        )
        .route(
            "/api/notes/:id",
            put(handlers::notes::update_note_handler).delete(handlers::notes::delete_note_handler),
        )
        // Dictionary API
        .route(
            "/api/dictionary",
            get(handlers::dictionary::list_entries_handler)
                .post(handlers::dictionary::create_entry_handler),
        )
        .route(
            "/api/dictionary/:id",
            put(handlers::dictionary::update_entry_handler)
                .delete(handlers::dictionary::delete_entry_handler),
        )
        // Prompts API
        .route(
            "/api/prompts",
            get(handlers::prompts::list_prompts_handler)
                .post(handlers::prompts::create_prompt_handler),
        )
        .route(
            "/api/prompts/:id",
            get(handlers::prompts::get_prompt_handler)
                .put(handlers::prompts::update_prompt_handler)
                .delete(handlers::prompts::delete_prompt_handler),
        )
        // Settings API
        .route(
            "/api/settings",
            post(handlers::settings::upsert_setting_handler),
        )
        .route(
            "/api/settings/:key",
            get(handlers::settings::get_setting_handler),
        )
        // Profile API
        .route(
            "/api/profile",
            get(handlers::profile::get_profile_handler)
                .post(handlers::profile::update_profile_handler),
        )
        // Audio proxy
        .route(
            "/api/text-to-speech",
            post(handlers::speech::text_to_speech_handler),
        )
        .route(
            "/api/transcribe",
            post(handlers::speech::transcribe_handler)
                .layer(DefaultBodyLimit::max(MAX_AUDIO_UPLOAD_SIZE + 4096)),
        )
        .with_state(state)
}
