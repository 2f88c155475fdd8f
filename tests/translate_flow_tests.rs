//! Integration tests for the translation pipeline.
//!
//! Tests cover:
//! - End-to-end request assembly for a conversation with history and
//!   dictionary entries
//! - History windowing (only the newest messages, replayed oldest first)
//! - Context toggling per conversation
//! - Custom prompt and model override resolution
//! - Assembly failures (missing API key, unknown conversation)
//! - The edit flow (no history, fixed target language)
//! - Assembly never writes: a failed provider call leaves no trace

use tolk::assembler::{self, Role, HISTORY_WINDOW, MAX_OUTPUT_TOKENS, TEMPERATURE};
use tolk::settings::{keys, DEFAULT_TRANSLATION_MODEL};
use tolk::storage::Storage;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn storage_with_key() -> Storage {
    let storage = Storage::open_in_memory().expect("open storage");
    storage
        .upsert_setting(keys::API_KEY, Some("sk-test"))
        .expect("set api key");
    storage
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_end_to_end_assembly_with_history_and_dictionary() {
    let storage = storage_with_key();
    let conv = storage
        .create_conversation("Paris trip", None)
        .expect("create conversation");
    storage
        .create_message(conv.id, "hello", "bonjour")
        .expect("create message");
    storage
        .create_dictionary_entry("ASAP", "dès que possible")
        .expect("create entry");

    let prepared = assembler::prepare_translation(&storage, conv.id, "see you soon", "French")
        .expect("prepare");

    assert_eq!(prepared.api_key, "sk-test");
    assert_eq!(prepared.request.model, DEFAULT_TRANSLATION_MODEL);
    assert_eq!(prepared.request.temperature, TEMPERATURE);
    assert_eq!(prepared.request.max_tokens, MAX_OUTPUT_TOKENS);

    // system, history pair, new input
    let turns = &prepared.request.turns;
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::System);
    assert!(turns[0].content.contains("translate the user's text into French"));
    assert!(turns[0]
        .content
        .contains("- 'ASAP' MUST BE TRANSLATED AS 'dès que possible'"));
    assert_eq!(turns[1].role, Role::User);
    assert_eq!(turns[1].content, "hello");
    assert_eq!(turns[2].role, Role::Assistant);
    assert_eq!(turns[2].content, "bonjour");
    assert_eq!(turns[3].role, Role::User);
    assert_eq!(turns[3].content, "see you soon");
}

#[test]
fn test_history_window_keeps_newest_replayed_oldest_first() {
    let storage = storage_with_key();
    let conv = storage.create_conversation("long", None).expect("create");
    for i in 0..10 {
        storage
            .create_message(conv.id, &format!("msg {i}"), &format!("tr {i}"))
            .expect("create message");
    }

    let prepared =
        assembler::prepare_translation(&storage, conv.id, "newest input", "Spanish").expect("prepare");
    let turns = &prepared.request.turns;

    // system + HISTORY_WINDOW pairs + input
    assert_eq!(turns.len(), 2 + 2 * HISTORY_WINDOW as usize);
    // The window holds messages 6..=9, oldest of the window first.
    assert_eq!(turns[1].content, "msg 6");
    assert_eq!(turns[2].content, "tr 6");
    assert_eq!(turns[7].content, "msg 9");
    assert_eq!(turns[8].content, "tr 9");
    assert_eq!(turns[9].content, "newest input");
}

#[test]
fn test_context_disabled_sends_no_history() {
    let storage = storage_with_key();
    let conv = storage.create_conversation("quiet", None).expect("create");
    storage
        .create_message(conv.id, "hello", "bonjour")
        .expect("create message");
    storage
        .update_conversation_settings(
            conv.id,
            &tolk::storage::ConversationSettingsPatch {
                use_context: Some(false),
                ..Default::default()
            },
        )
        .expect("update settings");

    let prepared =
        assembler::prepare_translation(&storage, conv.id, "input", "French").expect("prepare");
    assert_eq!(prepared.request.turns.len(), 2);
    assert_eq!(prepared.request.turns[1].content, "input");
}

#[test]
fn test_custom_prompt_and_model_override() {
    let storage = storage_with_key();
    storage
        .upsert_setting(keys::TRANSLATION_MODEL, Some("gpt-4o"))
        .expect("set model");
    let conv = storage
        .create_conversation("pirate", Some("Translate like a pirate.".to_string()))
        .expect("create");
    storage
        .update_conversation_settings(
            conv.id,
            &tolk::storage::ConversationSettingsPatch {
                translation_model_override: Some("gpt-4-turbo".to_string()),
                ..Default::default()
            },
        )
        .expect("update settings");

    let prepared =
        assembler::prepare_translation(&storage, conv.id, "ahoy", "French").expect("prepare");

    // Override beats the global setting.
    assert_eq!(prepared.request.model, "gpt-4-turbo");
    let instruction = &prepared.request.turns[0].content;
    assert!(instruction.starts_with("Translate like a pirate."));
    assert!(!instruction.contains("expert, professional translator"));
}

#[test]
fn test_missing_api_key_fails_before_anything_else() {
    let storage = Storage::open_in_memory().expect("open storage");
    let conv = storage.create_conversation("nokey", None).expect("create");

    let err = assembler::prepare_translation(&storage, conv.id, "text", "French").unwrap_err();
    assert!(matches!(err, assembler::AssembleError::MissingApiKey));
}

#[test]
fn test_unknown_conversation() {
    let storage = storage_with_key();
    let err = assembler::prepare_translation(&storage, 999, "text", "French").unwrap_err();
    assert!(matches!(
        err,
        assembler::AssembleError::ConversationNotFound(999)
    ));
}

#[test]
fn test_edit_flow_ignores_history_and_custom_prompt() {
    let storage = storage_with_key();
    let conv = storage
        .create_conversation("edits", Some("Be a pirate.".to_string()))
        .expect("create");
    storage
        .create_message(conv.id, "old one", "ancien")
        .expect("create message");
    let msg = storage
        .create_message(conv.id, "fix me", "répare-moi")
        .expect("create message");

    let (original, prepared) =
        assembler::prepare_edit(&storage, msg.id, "fixed text").expect("prepare edit");

    assert_eq!(original.id, msg.id);
    assert_eq!(original.original_text, "fix me");

    // No history, no custom prompt; the edit always targets the default
    // template's fixed language.
    let turns = &prepared.request.turns;
    assert_eq!(turns.len(), 2);
    assert!(turns[0].content.contains("translate the user's text into English"));
    assert!(!turns[0].content.contains("Be a pirate."));
    assert_eq!(turns[1].content, "fixed text");
}

#[test]
fn test_assembly_never_writes() {
    let storage = storage_with_key();
    let conv = storage.create_conversation("clean", None).expect("create");
    let before = storage
        .get_conversation(conv.id)
        .expect("get")
        .expect("exists");

    // Assemble but never persist, as a handler would on gateway failure.
    assembler::prepare_translation(&storage, conv.id, "doomed input", "French").expect("prepare");

    let after = storage
        .get_conversation(conv.id)
        .expect("get")
        .expect("exists");
    assert_eq!(after.updated_at, before.updated_at);
    assert!(storage.list_messages(conv.id).expect("list").is_empty());
}
