//! Audio proxy handlers: text-to-speech and transcription.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::settings::AppSettings;
use crate::tlog;
use crate::web::config::MAX_AUDIO_UPLOAD_SIZE;
use crate::web::state::SharedState;
use crate::web::utils::{api_error, gateway_error, storage_error};

#[derive(Deserialize)]
pub struct TextToSpeechRequest {
    pub text: String,
    /// When set, the conversation's model/voice overrides apply.
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// Synthesize speech for `text` and stream the MP3 bytes straight through.
pub async fn text_to_speech_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<TextToSpeechRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    let (gateway, api_key, model, voice) = {
        let st = state.lock().await;
        let settings = match AppSettings::load(&st.storage) {
            Ok(settings) => settings,
            Err(e) => return storage_error(e),
        };
        let Some(api_key) = settings.api_key() else {
            return api_error(StatusCode::BAD_REQUEST, "OpenAI API key is not set in settings");
        };
        let api_key = api_key.to_string();

        let conversation = match req.conversation_id {
            Some(id) => match st.storage.get_conversation(id) {
                Ok(Some(conv)) => Some(conv),
                Ok(None) => {
                    return api_error(StatusCode::NOT_FOUND, format!("conversation {id} not found"))
                }
                Err(e) => return storage_error(e),
            },
            None => None,
        };
        let model = settings
            .tts_model(conversation.as_ref().and_then(|c| c.tts_model_override.as_deref()))
            .to_string();
        let voice = settings
            .tts_voice(conversation.as_ref().and_then(|c| c.tts_voice_override.as_deref()))
            .to_string();
        (st.gateway.clone(), api_key, model, voice)
    };

    let resp = match gateway
        .synthesize_speech(&api_key, &model, &voice, &req.text)
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            tlog!("speech synthesis failed: {e}");
            return gateway_error(e);
        }
    };

    let headers = [(header::CONTENT_TYPE, "audio/mpeg")];
    (StatusCode::OK, headers, Body::from_stream(resp.bytes_stream())).into_response()
}

/// Transcribe an uploaded audio file (multipart field `audio_file`).
pub async fn transcribe_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Response {
    let mut audio: Option<Vec<u8>> = None;
    let mut filename = "audio.webm".to_string();
    let mut content_type = "application/octet-stream".to_string();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    format!("malformed multipart body: {e}"),
                )
            }
        };
        let name = field.name().unwrap_or("").to_string();
        if name == "audio_file" {
            if let Some(f) = field.file_name() {
                filename = f.to_string();
            }
            if let Some(ct) = field.content_type() {
                content_type = ct.to_string();
            }
            match field.bytes().await {
                Ok(bytes) => {
                    if bytes.len() > MAX_AUDIO_UPLOAD_SIZE {
                        return api_error(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            format!("audio exceeds maximum size of {MAX_AUDIO_UPLOAD_SIZE} bytes"),
                        );
                    }
                    audio = Some(bytes.to_vec());
                }
                Err(e) => {
                    return api_error(StatusCode::BAD_REQUEST, format!("failed to read audio: {e}"))
                }
            }
        }
    }

    let audio = match audio {
        Some(data) if !data.is_empty() => data,
        _ => return api_error(StatusCode::BAD_REQUEST, "no audio file provided"),
    };

    let (gateway, api_key, language) = {
        let st = state.lock().await;
        let settings = match AppSettings::load(&st.storage) {
            Ok(settings) => settings,
            Err(e) => return storage_error(e),
        };
        let Some(api_key) = settings.api_key() else {
            return api_error(StatusCode::BAD_REQUEST, "OpenAI API key is not set in settings");
        };
        (
            st.gateway.clone(),
            api_key.to_string(),
            settings.transcription_language().map(|l| l.to_string()),
        )
    };

    match gateway
        .transcribe(&api_key, audio, filename, content_type, language.as_deref())
        .await
    {
        Ok(text) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({ "transcribed_text": text })),
        )
            .into_response(),
        Err(e) => {
            tlog!("transcription failed: {e}");
            gateway_error(e)
        }
    }
}
