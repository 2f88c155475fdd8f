//! SQLite storage layer for tolk.
//!
//! Handles schema creation and CRUD for every entity: conversations,
//! messages, notes, dictionary entries, prompts, settings, and the
//! single-tenant user profile.
//!
//! Conversations carry one derived field, `updated_at`, refreshed by
//! [`Storage::touch_conversation`] whenever an owned message is created,
//! edited, or deleted.  Message writes and the touch run in the same
//! transaction so the timestamp can never go stale.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// The user profile is a single fixed row; multi-user support is out of
/// scope, and this constant is the one place that assumption lives.
pub const PROFILE_ROW_ID: i64 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    NotFound(String),
    AlreadyExists(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            StorageError::NotFound(msg) => write!(f, "not found: {msg}"),
            StorageError::AlreadyExists(msg) => write!(f, "already exists: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e)
    }
}

/// Map a unique-constraint violation to `AlreadyExists`; pass through
/// everything else.
fn map_unique(e: rusqlite::Error, what: &str) -> StorageError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return StorageError::AlreadyExists(what.to_string());
        }
    }
    StorageError::Sqlite(e)
}

/// Current time as milliseconds since the UNIX epoch.
///
/// Millisecond resolution keeps the `updated_at` touch meaningful across
/// back-to-back writes; ordering ties are still broken by primary key.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Conversation row stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: i64,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub use_context: bool,
    pub custom_prompt: Option<String>,
    pub is_archived: bool,
    pub translation_model_override: Option<String>,
    pub tts_model_override: Option<String>,
    pub tts_voice_override: Option<String>,
}

/// Message row stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub original_text: String,
    pub translated_text: String,
    pub created_at: i64,
}

/// Note row stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: i64,
    pub conversation_id: i64,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Dictionary entry: a mandatory term substitution injected into every
/// translation instruction.  `source_text` is unique (case-sensitive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntryRow {
    pub id: i64,
    pub source_text: String,
    pub target_text: String,
    pub created_at: i64,
}

/// Reusable instruction template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: i64,
}

/// Single-tenant profile row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRow {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub work_address: Option<String>,
}

/// Partial update for conversation settings; only provided fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationSettingsPatch {
    pub use_context: Option<bool>,
    pub custom_prompt: Option<String>,
    pub translation_model_override: Option<String>,
    pub tts_model_override: Option<String>,
    pub tts_voice_override: Option<String>,
}

// ---------------------------------------------------------------------------
// Storage handle
// ---------------------------------------------------------------------------

/// Main storage handle wrapping a SQLite connection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path. Creates schema if needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database (tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS conversations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL,
                use_context     INTEGER NOT NULL DEFAULT 1,
                custom_prompt   TEXT,
                is_archived     INTEGER NOT NULL DEFAULT 0,
                translation_model_override  TEXT,
                tts_model_override          TEXT,
                tts_voice_override          TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_recency
                ON conversations(is_archived, updated_at);

            CREATE TABLE IF NOT EXISTS messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                original_text   TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at);

            CREATE TABLE IF NOT EXISTS notes (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_conversation
                ON notes(conversation_id, created_at);

            CREATE TABLE IF NOT EXISTS dictionary_entries (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                source_text     TEXT NOT NULL UNIQUE,
                target_text     TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS prompts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT
            );

            CREATE TABLE IF NOT EXISTS user_profile (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                full_name       TEXT,
                phone_number    TEXT,
                email           TEXT,
                work_address    TEXT
            );
            ",
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------------

    pub fn create_conversation(
        &self,
        title: &str,
        custom_prompt: Option<String>,
    ) -> Result<ConversationRow, StorageError> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO conversations (title, created_at, updated_at, use_context, custom_prompt)
             VALUES (?1, ?2, ?2, 1, ?3)",
            params![title, now, custom_prompt],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(ConversationRow {
            id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            use_context: true,
            custom_prompt,
            is_archived: false,
            translation_model_override: None,
            tts_model_override: None,
            tts_voice_override: None,
        })
    }

    fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
        Ok(ConversationRow {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            use_context: row.get::<_, i32>(4)? != 0,
            custom_prompt: row.get(5)?,
            is_archived: row.get::<_, i32>(6)? != 0,
            translation_model_override: row.get(7)?,
            tts_model_override: row.get(8)?,
            tts_voice_override: row.get(9)?,
        })
    }

    const CONVERSATION_COLUMNS: &'static str = "id, title, created_at, updated_at, use_context,
        custom_prompt, is_archived, translation_model_override, tts_model_override,
        tts_voice_override";

    pub fn get_conversation(&self, id: i64) -> Result<Option<ConversationRow>, StorageError> {
        let sql = format!(
            "SELECT {} FROM conversations WHERE id = ?1",
            Self::CONVERSATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let row = stmt
            .query_row(params![id], Self::conversation_from_row)
            .optional()?;
        Ok(row)
    }

    /// List conversations by archive state, most recently updated first.
    pub fn list_conversations(
        &self,
        archived: bool,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<ConversationRow>, StorageError> {
        let sql = format!(
            "SELECT {} FROM conversations WHERE is_archived = ?1
             ORDER BY updated_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            Self::CONVERSATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![archived as i32, limit, skip],
            Self::conversation_from_row,
        )?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_conversations(&self) -> Result<i64, StorageError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn rename_conversation(&self, id: i64, title: &str) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE conversations SET title = ?1, updated_at = MAX(?2, updated_at + 1)
             WHERE id = ?3",
            params![title, now_millis(), id],
        )?;
        Ok(affected > 0)
    }

    pub fn set_conversation_archived(
        &self,
        id: i64,
        archived: bool,
    ) -> Result<bool, StorageError> {
        let affected = self.conn.execute(
            "UPDATE conversations SET is_archived = ?1, updated_at = MAX(?2, updated_at + 1)
             WHERE id = ?3",
            params![archived as i32, now_millis(), id],
        )?;
        Ok(affected > 0)
    }

    pub fn update_conversation_settings(
        &self,
        id: i64,
        patch: &ConversationSettingsPatch,
    ) -> Result<Option<ConversationRow>, StorageError> {
        let Some(mut conv) = self.get_conversation(id)? else {
            return Ok(None);
        };
        if let Some(use_context) = patch.use_context {
            conv.use_context = use_context;
        }
        if let Some(ref custom_prompt) = patch.custom_prompt {
            conv.custom_prompt = Some(custom_prompt.clone());
        }
        if let Some(ref model) = patch.translation_model_override {
            conv.translation_model_override = Some(model.clone());
        }
        if let Some(ref model) = patch.tts_model_override {
            conv.tts_model_override = Some(model.clone());
        }
        if let Some(ref voice) = patch.tts_voice_override {
            conv.tts_voice_override = Some(voice.clone());
        }
        conv.updated_at = conv.updated_at.max(now_millis()).max(conv.updated_at + 1);
        self.conn.execute(
            "UPDATE conversations SET use_context = ?1, custom_prompt = ?2,
                 translation_model_override = ?3, tts_model_override = ?4,
                 tts_voice_override = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                conv.use_context as i32,
                conv.custom_prompt,
                conv.translation_model_override,
                conv.tts_model_override,
                conv.tts_voice_override,
                conv.updated_at,
                id,
            ],
        )?;
        Ok(Some(conv))
    }

    /// Delete a conversation together with its messages and notes.
    ///
    /// The FK cascade does the child deletes; the transaction makes parent
    /// and children disappear together.
    pub fn delete_conversation(&self, id: i64) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(affected > 0)
    }

    /// Refresh a conversation's `updated_at` in response to a child mutation.
    ///
    /// `MAX(now, updated_at + 1)` keeps the value strictly increasing even
    /// when two writes land in the same millisecond.
    fn touch_conversation(
        conn: &Connection,
        conversation_id: i64,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        conn.execute(
            "UPDATE conversations SET updated_at = MAX(?1, updated_at + 1) WHERE id = ?2",
            params![now, conversation_id],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Insert a message and touch its parent conversation atomically.
    pub fn create_message(
        &self,
        conversation_id: i64,
        original_text: &str,
        translated_text: &str,
    ) -> Result<MessageRow, StorageError> {
        let now = now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![conversation_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(StorageError::NotFound(format!(
                "conversation {conversation_id}"
            )));
        }
        tx.execute(
            "INSERT INTO messages (conversation_id, original_text, translated_text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, original_text, translated_text, now],
        )?;
        let id = tx.last_insert_rowid();
        Self::touch_conversation(&tx, conversation_id, now)?;
        tx.commit()?;
        Ok(MessageRow {
            id,
            conversation_id,
            original_text: original_text.to_string(),
            translated_text: translated_text.to_string(),
            created_at: now,
        })
    }

    fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            original_text: row.get(2)?,
            translated_text: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, original_text, translated_text, created_at
             FROM messages WHERE id = ?1",
        )?;
        let row = stmt
            .query_row(params![id], Self::message_from_row)
            .optional()?;
        Ok(row)
    }

    /// All messages of a conversation in chronological order.
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<MessageRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, original_text, translated_text, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![conversation_id], Self::message_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// The `limit` most recent messages, newest first.  Ties in `created_at`
    /// break by primary key so insertion order always wins.
    pub fn last_messages(
        &self,
        conversation_id: i64,
        limit: u32,
    ) -> Result<Vec<MessageRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, original_text, translated_text, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![conversation_id, limit], Self::message_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Overwrite both texts on the same row and touch the parent.  Never
    /// creates a new message.
    pub fn update_message(
        &self,
        id: i64,
        original_text: &str,
        translated_text: &str,
    ) -> Result<Option<MessageRow>, StorageError> {
        let now = now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut msg) = tx
            .query_row(
                "SELECT id, conversation_id, original_text, translated_text, created_at
                 FROM messages WHERE id = ?1",
                params![id],
                Self::message_from_row,
            )
            .optional()?
        else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE messages SET original_text = ?1, translated_text = ?2 WHERE id = ?3",
            params![original_text, translated_text, id],
        )?;
        Self::touch_conversation(&tx, msg.conversation_id, now)?;
        tx.commit()?;
        msg.original_text = original_text.to_string();
        msg.translated_text = translated_text.to_string();
        Ok(Some(msg))
    }

    pub fn delete_message(&self, id: i64) -> Result<bool, StorageError> {
        let now = now_millis();
        let tx = self.conn.unchecked_transaction()?;
        let conversation_id: Option<i64> = tx
            .query_row(
                "SELECT conversation_id FROM messages WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(conversation_id) = conversation_id else {
            return Ok(false);
        };
        tx.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        Self::touch_conversation(&tx, conversation_id, now)?;
        tx.commit()?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    pub fn create_note(
        &self,
        conversation_id: i64,
        content: &str,
    ) -> Result<NoteRow, StorageError> {
        let now = now_millis();
        let result = self.conn.execute(
            "INSERT INTO notes (conversation_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![conversation_id, content, now],
        );
        match result {
            Ok(_) => Ok(NoteRow {
                id: self.conn.last_insert_rowid(),
                conversation_id,
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::NotFound(format!(
                    "conversation {conversation_id}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
        Ok(NoteRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    pub fn list_notes(&self, conversation_id: i64) -> Result<Vec<NoteRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, content, created_at, updated_at
             FROM notes WHERE conversation_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![conversation_id], Self::note_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn update_note(&self, id: i64, content: &str) -> Result<Option<NoteRow>, StorageError> {
        let now = now_millis();
        let affected = self.conn.execute(
            "UPDATE notes SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![content, now, id],
        )?;
        if affected == 0 {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, content, created_at, updated_at
             FROM notes WHERE id = ?1",
        )?;
        let row = stmt.query_row(params![id], Self::note_from_row).optional()?;
        Ok(row)
    }

    pub fn delete_note(&self, id: i64) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Dictionary
    // -----------------------------------------------------------------------

    /// Insert a dictionary entry.  A colliding `source_text` is a hard error,
    /// never a silent overwrite.
    pub fn create_dictionary_entry(
        &self,
        source_text: &str,
        target_text: &str,
    ) -> Result<DictionaryEntryRow, StorageError> {
        let now = now_millis();
        self.conn
            .execute(
                "INSERT INTO dictionary_entries (source_text, target_text, created_at)
                 VALUES (?1, ?2, ?3)",
                params![source_text, target_text, now],
            )
            .map_err(|e| map_unique(e, &format!("dictionary source '{source_text}'")))?;
        Ok(DictionaryEntryRow {
            id: self.conn.last_insert_rowid(),
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
            created_at: now,
        })
    }

    fn dictionary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DictionaryEntryRow> {
        Ok(DictionaryEntryRow {
            id: row.get(0)?,
            source_text: row.get(1)?,
            target_text: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    /// All entries in stable source-text order: the order the assembler
    /// renders rules in.
    pub fn list_dictionary_entries(&self) -> Result<Vec<DictionaryEntryRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_text, target_text, created_at
             FROM dictionary_entries ORDER BY source_text",
        )?;
        let rows = stmt.query_map([], Self::dictionary_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn update_dictionary_entry(
        &self,
        id: i64,
        source_text: Option<&str>,
        target_text: Option<&str>,
    ) -> Result<Option<DictionaryEntryRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_text, target_text, created_at
             FROM dictionary_entries WHERE id = ?1",
        )?;
        let Some(mut entry) = stmt
            .query_row(params![id], Self::dictionary_from_row)
            .optional()?
        else {
            return Ok(None);
        };
        if let Some(source) = source_text {
            entry.source_text = source.to_string();
        }
        if let Some(target) = target_text {
            entry.target_text = target.to_string();
        }
        self.conn
            .execute(
                "UPDATE dictionary_entries SET source_text = ?1, target_text = ?2 WHERE id = ?3",
                params![entry.source_text, entry.target_text, id],
            )
            .map_err(|e| map_unique(e, &format!("dictionary source '{}'", entry.source_text)))?;
        Ok(Some(entry))
    }

    pub fn delete_dictionary_entry(&self, id: i64) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM dictionary_entries WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Prompts
    // -----------------------------------------------------------------------

    pub fn create_prompt(&self, title: &str, content: &str) -> Result<PromptRow, StorageError> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO prompts (title, content, created_at) VALUES (?1, ?2, ?3)",
            params![title, content, now],
        )?;
        Ok(PromptRow {
            id: self.conn.last_insert_rowid(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    fn prompt_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PromptRow> {
        Ok(PromptRow {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn get_prompt(&self, id: i64) -> Result<Option<PromptRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, content, created_at FROM prompts WHERE id = ?1")?;
        let row = stmt
            .query_row(params![id], Self::prompt_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn list_prompts(&self, skip: u32, limit: u32) -> Result<Vec<PromptRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, created_at FROM prompts
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, skip], Self::prompt_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn update_prompt(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<PromptRow>, StorageError> {
        let Some(mut prompt) = self.get_prompt(id)? else {
            return Ok(None);
        };
        if let Some(title) = title {
            prompt.title = title.to_string();
        }
        if let Some(content) = content {
            prompt.content = content.to_string();
        }
        self.conn.execute(
            "UPDATE prompts SET title = ?1, content = ?2 WHERE id = ?3",
            params![prompt.title, prompt.content, id],
        )?;
        Ok(Some(prompt))
    }

    pub fn delete_prompt(&self, id: i64) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Read a setting.  Absence is a normal state; callers fall back to
    /// defaults.  A stored NULL value is indistinguishable from absence.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    pub fn upsert_setting(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Profile
    // -----------------------------------------------------------------------

    pub fn get_profile(&self) -> Result<Option<ProfileRow>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT full_name, phone_number, email, work_address
                 FROM user_profile WHERE id = ?1",
                params![PROFILE_ROW_ID],
                |row| {
                    Ok(ProfileRow {
                        full_name: row.get(0)?,
                        phone_number: row.get(1)?,
                        email: row.get(2)?,
                        work_address: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Partial profile update; creates the row on first write.
    pub fn upsert_profile(&self, patch: &ProfileRow) -> Result<ProfileRow, StorageError> {
        let mut profile = self.get_profile()?.unwrap_or_default();
        if let Some(ref full_name) = patch.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(ref phone_number) = patch.phone_number {
            profile.phone_number = Some(phone_number.clone());
        }
        if let Some(ref email) = patch.email {
            profile.email = Some(email.clone());
        }
        if let Some(ref work_address) = patch.work_address {
            profile.work_address = Some(work_address.clone());
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO user_profile (id, full_name, phone_number, email, work_address)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                PROFILE_ROW_ID,
                profile.full_name,
                profile.phone_number,
                profile.email,
                profile.work_address,
            ],
        )?;
        Ok(profile)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    #[test]
    fn test_schema_creation() {
        let storage = test_storage();
        storage.upsert_setting("probe", Some("1")).unwrap();
        assert_eq!(storage.get_setting("probe").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_conversation_crud() {
        let storage = test_storage();

        let conv = storage.create_conversation("First", None).unwrap();
        assert_eq!(conv.title, "First");
        assert!(conv.use_context);
        assert!(!conv.is_archived);
        assert_eq!(conv.created_at, conv.updated_at);

        let loaded = storage.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded.title, "First");

        assert!(storage.rename_conversation(conv.id, "Renamed").unwrap());
        let loaded = storage.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert!(loaded.updated_at > loaded.created_at);

        assert!(storage.set_conversation_archived(conv.id, true).unwrap());
        assert!(storage.list_conversations(false, 0, 100).unwrap().is_empty());
        assert_eq!(storage.list_conversations(true, 0, 100).unwrap().len(), 1);

        assert!(storage.delete_conversation(conv.id).unwrap());
        assert!(storage.get_conversation(conv.id).unwrap().is_none());
        assert!(!storage.delete_conversation(conv.id).unwrap());
    }

    #[test]
    fn test_conversation_created_with_seed_prompt() {
        let storage = test_storage();
        let conv = storage
            .create_conversation("Seeded", Some("Always formal.".to_string()))
            .unwrap();
        let loaded = storage.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded.custom_prompt.as_deref(), Some("Always formal."));
    }

    #[test]
    fn test_list_conversations_orders_by_update() {
        let storage = test_storage();
        let a = storage.create_conversation("a", None).unwrap();
        let b = storage.create_conversation("b", None).unwrap();

        // A message in `a` makes it the most recently updated.
        storage.create_message(a.id, "hi", "bonjour").unwrap();

        let listed = storage.list_conversations(false, 0, 100).unwrap();
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }

    #[test]
    fn test_touch_is_strictly_monotonic() {
        let storage = test_storage();
        let conv = storage.create_conversation("t", None).unwrap();
        let mut last = conv.updated_at;

        let msg = storage.create_message(conv.id, "one", "un").unwrap();
        let after_create = storage.get_conversation(conv.id).unwrap().unwrap();
        assert!(after_create.updated_at > last);
        last = after_create.updated_at;

        storage.update_message(msg.id, "two", "deux").unwrap();
        let after_edit = storage.get_conversation(conv.id).unwrap().unwrap();
        assert!(after_edit.updated_at > last);
        last = after_edit.updated_at;

        storage.delete_message(msg.id).unwrap();
        let after_delete = storage.get_conversation(conv.id).unwrap().unwrap();
        assert!(after_delete.updated_at > last);
        assert!(after_delete.updated_at >= after_delete.created_at);
    }

    #[test]
    fn test_message_edit_in_place() {
        let storage = test_storage();
        let conv = storage.create_conversation("e", None).unwrap();
        let first = storage.create_message(conv.id, "hello", "bonjour").unwrap();
        storage.create_message(conv.id, "bye", "au revoir").unwrap();

        let updated = storage
            .update_message(first.id, "hello!", "bonjour !")
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.original_text, "hello!");
        assert_eq!(updated.translated_text, "bonjour !");
        assert_eq!(storage.list_messages(conv.id).unwrap().len(), 2);
    }

    #[test]
    fn test_last_messages_newest_first_with_pk_tiebreak() {
        let storage = test_storage();
        let conv = storage.create_conversation("h", None).unwrap();
        let mut ids = Vec::new();
        for i in 0..10 {
            let msg = storage
                .create_message(conv.id, &format!("msg {i}"), &format!("tr {i}"))
                .unwrap();
            ids.push(msg.id);
        }

        let recent = storage.last_messages(conv.id, 4).unwrap();
        assert_eq!(recent.len(), 4);
        // Newest first; millisecond ties resolve by descending pk.
        assert_eq!(recent[0].id, ids[9]);
        assert_eq!(recent[1].id, ids[8]);
        assert_eq!(recent[2].id, ids[7]);
        assert_eq!(recent[3].id, ids[6]);
    }

    #[test]
    fn test_create_message_for_missing_conversation() {
        let storage = test_storage();
        let err = storage.create_message(42, "x", "y").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_cascade_delete() {
        let storage = test_storage();
        let conv = storage.create_conversation("c", None).unwrap();
        let msg = storage.create_message(conv.id, "a", "b").unwrap();
        let note = storage.create_note(conv.id, "remember").unwrap();

        assert!(storage.delete_conversation(conv.id).unwrap());
        assert!(storage.get_message(msg.id).unwrap().is_none());
        assert!(storage.list_notes(conv.id).unwrap().is_empty());
        assert!(!storage.delete_note(note.id).unwrap());
    }

    #[test]
    fn test_note_crud() {
        let storage = test_storage();
        let conv = storage.create_conversation("n", None).unwrap();

        let note = storage.create_note(conv.id, "first").unwrap();
        assert_eq!(note.created_at, note.updated_at);

        let updated = storage.update_note(note.id, "second").unwrap().unwrap();
        assert_eq!(updated.content, "second");
        assert!(updated.updated_at >= note.updated_at);

        assert_eq!(storage.list_notes(conv.id).unwrap().len(), 1);
        assert!(storage.delete_note(note.id).unwrap());
        assert!(storage.update_note(note.id, "gone").unwrap().is_none());

        // Notes require an existing parent.
        let err = storage.create_note(999, "orphan").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_dictionary_duplicate_source() {
        let storage = test_storage();
        storage.create_dictionary_entry("hello", "bonjour").unwrap();

        let err = storage
            .create_dictionary_entry("hello", "salut")
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // The original mapping is untouched.
        let entries = storage.list_dictionary_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target_text, "bonjour");
    }

    #[test]
    fn test_dictionary_update_collision() {
        let storage = test_storage();
        storage.create_dictionary_entry("hello", "bonjour").unwrap();
        let other = storage.create_dictionary_entry("bye", "au revoir").unwrap();

        let err = storage
            .update_dictionary_entry(other.id, Some("hello"), None)
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_dictionary_ordering_is_case_sensitive_by_source() {
        let storage = test_storage();
        storage.create_dictionary_entry("zebra", "zèbre").unwrap();
        storage.create_dictionary_entry("apple", "pomme").unwrap();
        storage.create_dictionary_entry("Apple", "Pomme").unwrap();

        let sources: Vec<String> = storage
            .list_dictionary_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.source_text)
            .collect();
        assert_eq!(sources, vec!["Apple", "apple", "zebra"]);
    }

    #[test]
    fn test_prompt_crud() {
        let storage = test_storage();
        let prompt = storage.create_prompt("Formal", "Be formal.").unwrap();

        let loaded = storage.get_prompt(prompt.id).unwrap().unwrap();
        assert_eq!(loaded.content, "Be formal.");

        let updated = storage
            .update_prompt(prompt.id, None, Some("Be very formal."))
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Formal");
        assert_eq!(updated.content, "Be very formal.");

        assert_eq!(storage.list_prompts(0, 100).unwrap().len(), 1);
        assert!(storage.delete_prompt(prompt.id).unwrap());
        assert!(storage.get_prompt(prompt.id).unwrap().is_none());
    }

    #[test]
    fn test_settings_upsert_and_absent() {
        let storage = test_storage();
        assert!(storage.get_setting("missing").unwrap().is_none());

        storage
            .upsert_setting("translation_model", Some("gpt-4o"))
            .unwrap();
        assert_eq!(
            storage.get_setting("translation_model").unwrap().as_deref(),
            Some("gpt-4o")
        );

        storage.upsert_setting("translation_model", None).unwrap();
        assert!(storage.get_setting("translation_model").unwrap().is_none());
    }

    #[test]
    fn test_profile_upsert_is_partial() {
        let storage = test_storage();
        assert!(storage.get_profile().unwrap().is_none());

        storage
            .upsert_profile(&ProfileRow {
                full_name: Some("Sami".to_string()),
                ..Default::default()
            })
            .unwrap();
        storage
            .upsert_profile(&ProfileRow {
                email: Some("sami@example.com".to_string()),
                ..Default::default()
            })
            .unwrap();

        let profile = storage.get_profile().unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Sami"));
        assert_eq!(profile.email.as_deref(), Some("sami@example.com"));
    }
}
