//! HTTP client for the OpenAI-compatible AI provider.
//!
//! Three operations cross this boundary: chat-based translation, speech
//! synthesis, and transcription.  Results are typed — a failure is a
//! [`GatewayError`] variant, never a sentinel string mixed into translated
//! text.  No retries happen here; a failed call is terminal for the request
//! and the caller surfaces it.

use serde::{Deserialize, Serialize};

use crate::assembler::{TranslationRequest, Turn};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Transcription always uses the provider's speech-recognition model; there
/// is no per-conversation override for it.
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum GatewayError {
    /// The provider rejected the credentials (401/403).
    Config(String),
    /// The provider answered with any other non-success status.
    Provider(String),
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    Http(reqwest::Error),
    /// The provider answered 2xx but the body was not usable.
    Malformed(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Config(msg) => write!(f, "gateway rejected credentials: {msg}"),
            GatewayError::Provider(msg) => write!(f, "gateway error: {msg}"),
            GatewayError::Http(e) => write!(f, "gateway unreachable: {e}"),
            GatewayError::Malformed(msg) => write!(f, "malformed gateway response: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Http(e)
    }
}

fn classify_status(status: reqwest::StatusCode, body: String) -> GatewayError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            GatewayError::Config(body)
        }
        _ => GatewayError::Provider(format!("{status}: {body}")),
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

// ---------------------------------------------------------------------------
// Gateway handle
// ---------------------------------------------------------------------------

/// Shared client for all provider calls.  Cheap to clone; handlers clone it
/// out of the app state so the storage lock is never held across a network
/// round trip.
#[derive(Clone)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(OPENAI_API_BASE)
    }
}

impl Gateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_status(status, body))
    }

    /// Run an assembled translation request and return the trimmed text of
    /// the first choice.
    pub async fn translate(
        &self,
        api_key: &str,
        request: &TranslationRequest,
    ) -> Result<String, GatewayError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.turns,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::Malformed("no completion choice".to_string()))?;
        Ok(content.trim().to_string())
    }

    /// Request MP3 audio for `text`.  Returns the raw response so the caller
    /// can stream the byte stream straight through without buffering.
    pub async fn synthesize_speech(
        &self,
        api_key: &str,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let body = SpeechBody {
            model,
            voice,
            input: text,
            response_format: "mp3",
        };
        let resp = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await
    }

    /// Transcribe uploaded audio.  `language` of `None` means auto-detect;
    /// the field is omitted entirely in that case.
    pub async fn transcribe(
        &self,
        api_key: &str,
        audio: Vec<u8>,
        filename: String,
        content_type: String,
        language: Option<&str>,
    ) -> Result<String, GatewayError> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename)
            .mime_str(&content_type)
            .map_err(|e| GatewayError::Malformed(format!("bad content type: {e}")))?;
        let mut form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", part);
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let resp = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let parsed: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{Role, Turn};

    #[test]
    fn test_chat_body_serialization() {
        let turns = vec![
            Turn::new(Role::System, "instruction"),
            Turn::new(Role::User, "hello there"),
        ];
        let body = ChatCompletionBody {
            model: "gpt-4o-mini",
            messages: &turns,
            temperature: 0.2,
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello there");
    }

    #[test]
    fn test_status_classification() {
        let err = classify_status(reqwest::StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert!(matches!(err, GatewayError::Config(_)));

        let err = classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(err, GatewayError::Provider(_)));
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_completion_response_parsing() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  bonjour  "}}]}"#,
        )
        .unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert_eq!(content.trim(), "bonjour");
    }
}
