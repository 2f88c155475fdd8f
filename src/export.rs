//! Plain-text conversation export.
//!
//! Pure formatting: title, export timestamp, a fixed separator, then each
//! message as an original/translated pair in chronological order.  No AI
//! involvement.

use crate::logging::civil_date;
use crate::storage::{ConversationRow, MessageRow};

const SEPARATOR_WIDTH: usize = 40;

/// Attachment filename offered for a conversation export.
pub fn export_filename(conversation_id: i64) -> String {
    format!("conversation_{conversation_id}.txt")
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS`.
///
/// The timestamp is UTC; no local-zone conversion is applied, so the same
/// export produces the same header on any server.
fn format_timestamp(millis: i64) -> String {
    let secs = millis.div_euclid(1000);
    let days = secs.div_euclid(86400);
    let time_secs = secs.rem_euclid(86400) as u64;
    let (y, m, d) = civil_date(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        y,
        m,
        d,
        time_secs / 3600,
        (time_secs % 3600) / 60,
        time_secs % 60
    )
}

/// Render the full transcript.  `exported_at` is epoch milliseconds.
pub fn render_transcript(
    conversation: &ConversationRow,
    messages: &[MessageRow],
    exported_at: i64,
) -> String {
    let mut out = format!("Conversation Title: {}\n", conversation.title);
    out.push_str(&format!("Exported on: {}\n", format_timestamp(exported_at)));
    out.push_str(&"=".repeat(SEPARATOR_WIDTH));
    out.push_str("\n\n");

    for message in messages {
        out.push_str(&format!("[User]: {}\n", message.original_text));
        out.push_str(&format!("[Assistant]: {}\n", message.translated_text));
        out.push_str("---\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(title: &str) -> ConversationRow {
        ConversationRow {
            id: 7,
            title: title.to_string(),
            created_at: 0,
            updated_at: 0,
            use_context: true,
            custom_prompt: None,
            is_archived: false,
            translation_model_override: None,
            tts_model_override: None,
            tts_voice_override: None,
        }
    }

    fn message(id: i64, original: &str, translated: &str) -> MessageRow {
        MessageRow {
            id,
            conversation_id: 7,
            original_text: original.to_string(),
            translated_text: translated.to_string(),
            created_at: id,
        }
    }

    #[test]
    fn test_transcript_format() {
        let conv = conversation("Trip planning");
        let messages = vec![
            message(1, "hello", "bonjour"),
            message(2, "thanks", "merci"),
        ];
        // 2026-08-30 09:15:00 UTC
        let rendered = render_transcript(&conv, &messages, 1_788_081_300_000);

        let expected = "Conversation Title: Trip planning\n\
                        Exported on: 2026-08-30 09:15:00\n\
                        ========================================\n\
                        \n\
                        [User]: hello\n\
                        [Assistant]: bonjour\n\
                        ---\n\
                        [User]: thanks\n\
                        [Assistant]: merci\n\
                        ---\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_empty_conversation_still_renders_header() {
        let rendered = render_transcript(&conversation("Empty"), &[], 0);
        assert!(rendered.starts_with("Conversation Title: Empty\n"));
        assert!(rendered.contains("Exported on: 1970-01-01 00:00:00\n"));
        assert!(rendered.contains(&"=".repeat(40)));
        assert!(!rendered.contains("[User]"));
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(12), "conversation_12.txt");
    }
}
