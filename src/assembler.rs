//! Context assembly for translation requests.
//!
//! This is the heart of the backend: given a conversation and a new input,
//! gather the conversation's settings, its recent history, and the global
//! term dictionary, and produce the exact ordered instruction sequence sent
//! to the AI gateway.  Everything here is storage reads and string building;
//! the network call lives in [`crate::gateway`] and persistence of the
//! result stays with the caller, so the pipeline is testable end to end
//! without a provider.

use serde::Serialize;

use crate::settings::AppSettings;
use crate::storage::{DictionaryEntryRow, MessageRow, Storage, StorageError};

/// How many prior messages are replayed when a conversation has
/// `use_context` enabled.
pub const HISTORY_WINDOW: u32 = 4;

/// Deterministic-leaning sampling; translation is not a creative task.
pub const TEMPERATURE: f32 = 0.2;

pub const MAX_OUTPUT_TOKENS: u32 = 2000;

// TODO: the edit flow re-translates into English regardless of the
// conversation's target language; needs a product decision before changing.
pub const EDIT_TARGET_LANGUAGE: &str = "English";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn of the gateway conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Fully assembled request, ready for the gateway.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub model: String,
    pub turns: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug)]
pub enum AssembleError {
    /// No API key configured; the owner has to supply one, retrying is
    /// pointless.
    MissingApiKey,
    ConversationNotFound(i64),
    MessageNotFound(i64),
    Storage(StorageError),
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssembleError::MissingApiKey => {
                write!(f, "OpenAI API key is not set in settings")
            }
            AssembleError::ConversationNotFound(id) => write!(f, "conversation {id} not found"),
            AssembleError::MessageNotFound(id) => write!(f, "message {id} not found"),
            AssembleError::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<StorageError> for AssembleError {
    fn from(e: StorageError) -> Self {
        AssembleError::Storage(e)
    }
}

/// Everything a handler needs to call the gateway.
#[derive(Debug, Clone)]
pub struct PreparedTranslation {
    pub api_key: String,
    pub request: TranslationRequest,
}

/// The synthesized instruction used when a conversation has no custom
/// prompt: translate for meaning, answer with the translation only, keep the
/// result polished and professional.
fn default_instruction(target_language: &str) -> String {
    format!(
        "You are an expert, professional translator. Your task is to translate the user's text into {target_language}.\n\
         Analyze the user's input, which may be in colloquial, fast, or even grammatically weak language.\n\
         Your primary goal is to understand the core *meaning and intent* of the text, not just the literal words.\n\
         Then, provide a translation that is not only accurate but also well-phrased, professional, and grammatically perfect in the target language.\n\
         Do not add any commentary or explanations. Your response must only be the final, polished translation."
    )
}

/// Render the mandatory term-substitution block, or `None` when the
/// dictionary is empty (the segment is omitted entirely, not left as an
/// empty block).  Entries arrive ordered by source text.
fn dictionary_rules(entries: &[DictionaryEntryRow]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut rules = String::from(
        "\n\n--- STRICT TRANSLATION RULES ---\n\
         You MUST translate the following terms exactly as specified, without any deviation:\n",
    );
    for entry in entries {
        rules.push_str(&format!(
            "- '{}' MUST BE TRANSLATED AS '{}'\n",
            entry.source_text, entry.target_text
        ));
    }
    rules.push_str("--- END OF STRICT RULES ---\n");
    Some(rules)
}

/// Resolve the effective instruction text: a custom prompt verbatim, or the
/// default template.  The dictionary rules apply in both cases.
pub fn system_instruction(
    custom_prompt: Option<&str>,
    target_language: &str,
    entries: &[DictionaryEntryRow],
) -> String {
    let mut instruction = match custom_prompt {
        Some(prompt) => prompt.to_string(),
        None => default_instruction(target_language),
    };
    if let Some(rules) = dictionary_rules(entries) {
        instruction.push_str(&rules);
    }
    instruction
}

/// Build the ordered turn sequence: instruction, then each history message
/// expanded to a user/assistant pair in chronological order, then the new
/// input as the final user turn.
///
/// `recent_newest_first` is the storage-layer window (newest first); it is
/// reversed here so the gateway sees oldest first.
fn build_turns(
    instruction: String,
    recent_newest_first: &[MessageRow],
    input: &str,
) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(2 + 2 * recent_newest_first.len());
    turns.push(Turn::new(Role::System, instruction));
    for msg in recent_newest_first.iter().rev() {
        turns.push(Turn::new(Role::User, msg.original_text.clone()));
        turns.push(Turn::new(Role::Assistant, msg.translated_text.clone()));
    }
    turns.push(Turn::new(Role::User, input));
    turns
}

/// Assemble the gateway request for a new translation in a conversation.
///
/// Fails without touching anything when the API key is absent or the
/// conversation is gone; the caller persists the result only after the
/// gateway succeeds, so a failed request leaves no trace.
pub fn prepare_translation(
    storage: &Storage,
    conversation_id: i64,
    input: &str,
    target_language: &str,
) -> Result<PreparedTranslation, AssembleError> {
    let settings = AppSettings::load(storage)?;
    let api_key = settings
        .api_key()
        .ok_or(AssembleError::MissingApiKey)?
        .to_string();

    let conversation = storage
        .get_conversation(conversation_id)?
        .ok_or(AssembleError::ConversationNotFound(conversation_id))?;

    let model = settings
        .translation_model(conversation.translation_model_override.as_deref())
        .to_string();

    let entries = storage.list_dictionary_entries()?;
    let instruction = system_instruction(
        conversation.custom_prompt.as_deref(),
        target_language,
        &entries,
    );

    let history = if conversation.use_context {
        storage.last_messages(conversation_id, HISTORY_WINDOW)?
    } else {
        Vec::new()
    };

    Ok(PreparedTranslation {
        api_key,
        request: TranslationRequest {
            model,
            turns: build_turns(instruction, &history, input),
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        },
    })
}

/// Assemble the gateway request for re-translating an edited message.
///
/// Deliberately different from the conversation flow: no history regardless
/// of `use_context`, no custom prompt, and a fixed target language (see
/// [`EDIT_TARGET_LANGUAGE`]).  Returns the existing message so the caller
/// can overwrite it in place.
pub fn prepare_edit(
    storage: &Storage,
    message_id: i64,
    new_text: &str,
) -> Result<(MessageRow, PreparedTranslation), AssembleError> {
    let message = storage
        .get_message(message_id)?
        .ok_or(AssembleError::MessageNotFound(message_id))?;

    let settings = AppSettings::load(storage)?;
    let api_key = settings
        .api_key()
        .ok_or(AssembleError::MissingApiKey)?
        .to_string();

    let entries = storage.list_dictionary_entries()?;
    let instruction = system_instruction(None, EDIT_TARGET_LANGUAGE, &entries);

    let prepared = PreparedTranslation {
        api_key,
        request: TranslationRequest {
            model: settings.translation_model(None).to_string(),
            turns: build_turns(instruction, &[], new_text),
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        },
    };
    Ok((message, prepared))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, target: &str) -> DictionaryEntryRow {
        DictionaryEntryRow {
            id: 0,
            source_text: source.to_string(),
            target_text: target.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_dictionary_segment_omitted_when_empty() {
        let instruction = system_instruction(None, "French", &[]);
        assert!(!instruction.contains("STRICT TRANSLATION RULES"));
    }

    #[test]
    fn test_dictionary_segment_renders_one_rule_per_entry() {
        let entries = vec![entry("hello", "bonjour"), entry("world", "monde")];
        let instruction = system_instruction(None, "French", &entries);
        assert!(instruction.contains("--- STRICT TRANSLATION RULES ---"));
        assert!(instruction.contains("- 'hello' MUST BE TRANSLATED AS 'bonjour'"));
        assert!(instruction.contains("- 'world' MUST BE TRANSLATED AS 'monde'"));
        assert!(instruction.contains("--- END OF STRICT RULES ---"));
    }

    #[test]
    fn test_custom_prompt_replaces_default_template() {
        let entries = vec![entry("hello", "bonjour")];
        let instruction = system_instruction(Some("Translate like a pirate."), "French", &entries);
        assert!(instruction.starts_with("Translate like a pirate."));
        assert!(!instruction.contains("expert, professional translator"));
        // The dictionary rules still apply under a custom prompt.
        assert!(instruction.contains("- 'hello' MUST BE TRANSLATED AS 'bonjour'"));
        assert_eq!(
            instruction,
            format!(
                "Translate like a pirate.{}",
                dictionary_rules(&entries).unwrap()
            )
        );
    }

    #[test]
    fn test_default_template_is_parameterized() {
        let instruction = system_instruction(None, "Japanese", &[]);
        assert!(instruction.contains("translate the user's text into Japanese"));
    }

    #[test]
    fn test_turn_sequence_shape() {
        let history = vec![
            MessageRow {
                id: 2,
                conversation_id: 1,
                original_text: "second".to_string(),
                translated_text: "deuxième".to_string(),
                created_at: 20,
            },
            MessageRow {
                id: 1,
                conversation_id: 1,
                original_text: "first".to_string(),
                translated_text: "premier".to_string(),
                created_at: 10,
            },
        ];
        let turns = build_turns("sys".to_string(), &history, "third");

        // system, then chronological user/assistant pairs, then the input.
        assert_eq!(turns.len(), 6);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1].content, "first");
        assert_eq!(turns[2].content, "premier");
        assert_eq!(turns[2].role, Role::Assistant);
        assert_eq!(turns[3].content, "second");
        assert_eq!(turns[4].content, "deuxième");
        assert_eq!(turns[5].role, Role::User);
        assert_eq!(turns[5].content, "third");
    }

    #[test]
    fn test_role_serialization_is_lowercase() {
        let turn = Turn::new(Role::Assistant, "x");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
