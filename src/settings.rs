//! Typed view over the flat settings table.
//!
//! The settings store is a string-to-string map; this module fronts it with
//! an explicit struct so the rest of the crate never touches raw keys.
//! Unknown keys stay reachable through the raw get/upsert endpoints.
//!
//! Empty values count as unset, matching how users clear a field in the UI.

use crate::storage::{Storage, StorageError};

/// Known setting keys.
pub mod keys {
    pub const API_KEY: &str = "openai_api_key";
    pub const TRANSLATION_MODEL: &str = "translation_model";
    pub const TTS_MODEL: &str = "tts_model";
    pub const TTS_VOICE: &str = "tts_voice";
    pub const TRANSCRIPTION_LANGUAGE: &str = "transcription_language";
    pub const DEFAULT_PROMPT_ID: &str = "default_prompt_id";
}

pub const DEFAULT_TRANSLATION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_TTS_VOICE: &str = "alloy";

/// Sentinel meaning "let the provider detect the language".  Never forwarded
/// to the gateway.
pub const AUTO_LANGUAGE: &str = "auto";

/// Snapshot of the known settings, loaded once per request.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub api_key: Option<String>,
    pub translation_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub transcription_language: Option<String>,
    pub default_prompt_id: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl AppSettings {
    pub fn load(storage: &Storage) -> Result<Self, StorageError> {
        Ok(Self {
            api_key: non_empty(storage.get_setting(keys::API_KEY)?),
            translation_model: non_empty(storage.get_setting(keys::TRANSLATION_MODEL)?),
            tts_model: non_empty(storage.get_setting(keys::TTS_MODEL)?),
            tts_voice: non_empty(storage.get_setting(keys::TTS_VOICE)?),
            transcription_language: non_empty(
                storage.get_setting(keys::TRANSCRIPTION_LANGUAGE)?,
            ),
            default_prompt_id: non_empty(storage.get_setting(keys::DEFAULT_PROMPT_ID)?)
                .and_then(|v| v.parse().ok()),
        })
    }

    /// The API key, or `None` when the owner has not configured one yet.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Effective translation model: per-conversation override, then the
    /// global setting, then the hardcoded default.
    pub fn translation_model<'a>(&'a self, conversation_override: Option<&'a str>) -> &'a str {
        conversation_override
            .or(self.translation_model.as_deref())
            .unwrap_or(DEFAULT_TRANSLATION_MODEL)
    }

    pub fn tts_model<'a>(&'a self, conversation_override: Option<&'a str>) -> &'a str {
        conversation_override
            .or(self.tts_model.as_deref())
            .unwrap_or(DEFAULT_TTS_MODEL)
    }

    pub fn tts_voice<'a>(&'a self, conversation_override: Option<&'a str>) -> &'a str {
        conversation_override
            .or(self.tts_voice.as_deref())
            .unwrap_or(DEFAULT_TTS_VOICE)
    }

    /// Language hint for transcription.  The `auto` sentinel means
    /// auto-detect and is normalized to `None` here so it never crosses the
    /// gateway boundary.
    pub fn transcription_language(&self) -> Option<&str> {
        self.transcription_language
            .as_deref()
            .filter(|lang| *lang != AUTO_LANGUAGE)
    }

    /// Content of the prompt seeded into new conversations, if the
    /// `default_prompt_id` setting points at an existing prompt.
    pub fn default_prompt_content(
        &self,
        storage: &Storage,
    ) -> Result<Option<String>, StorageError> {
        let Some(id) = self.default_prompt_id else {
            return Ok(None);
        };
        Ok(storage.get_prompt(id)?.map(|p| p.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with(pairs: &[(&str, &str)]) -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        for (key, value) in pairs {
            storage.upsert_setting(key, Some(value)).unwrap();
        }
        storage
    }

    #[test]
    fn test_empty_values_are_unset() {
        let storage = storage_with(&[(keys::API_KEY, ""), (keys::TRANSLATION_MODEL, "gpt-4o")]);
        let settings = AppSettings::load(&storage).unwrap();
        assert!(settings.api_key().is_none());
        assert_eq!(settings.translation_model(None), "gpt-4o");
    }

    #[test]
    fn test_model_fallback_chain() {
        let storage = storage_with(&[]);
        let settings = AppSettings::load(&storage).unwrap();
        assert_eq!(settings.translation_model(None), DEFAULT_TRANSLATION_MODEL);
        assert_eq!(settings.translation_model(Some("gpt-4o")), "gpt-4o");
        assert_eq!(settings.tts_model(None), DEFAULT_TTS_MODEL);
        assert_eq!(settings.tts_voice(Some("nova")), "nova");
    }

    #[test]
    fn test_auto_language_sentinel_is_omitted() {
        let storage = storage_with(&[(keys::TRANSCRIPTION_LANGUAGE, "auto")]);
        let settings = AppSettings::load(&storage).unwrap();
        assert!(settings.transcription_language().is_none());

        let storage = storage_with(&[(keys::TRANSCRIPTION_LANGUAGE, "ar")]);
        let settings = AppSettings::load(&storage).unwrap();
        assert_eq!(settings.transcription_language(), Some("ar"));
    }

    #[test]
    fn test_default_prompt_resolution() {
        let storage = storage_with(&[]);
        let prompt = storage.create_prompt("Formal", "Be formal.").unwrap();
        storage
            .upsert_setting(keys::DEFAULT_PROMPT_ID, Some(&prompt.id.to_string()))
            .unwrap();

        let settings = AppSettings::load(&storage).unwrap();
        assert_eq!(
            settings.default_prompt_content(&storage).unwrap().as_deref(),
            Some("Be formal.")
        );

        // Dangling or unparseable ids are ignored.
        storage
            .upsert_setting(keys::DEFAULT_PROMPT_ID, Some("999"))
            .unwrap();
        let settings = AppSettings::load(&storage).unwrap();
        assert!(settings.default_prompt_content(&storage).unwrap().is_none());

        storage
            .upsert_setting(keys::DEFAULT_PROMPT_ID, Some("not-a-number"))
            .unwrap();
        let settings = AppSettings::load(&storage).unwrap();
        assert!(settings.default_prompt_id.is_none());
    }
}
