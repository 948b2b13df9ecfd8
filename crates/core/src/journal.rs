//! Journal entry and streak records, plus the text metrics shown while
//! writing.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntryId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Table holding journal entries.
pub const ENTRIES_TABLE: &str = "journal_entries";

/// Table holding one streak row per user.
pub const STREAKS_TABLE: &str = "user_streaks";

/// Content of the entry created for a user who has not written anything yet.
pub const WELCOME_CONTENT: &str = "Witaj w 10xJournal!

To jest Twoja prywatna przestrzeń do myślenia i pisania, wolna od rozpraszaczy. Celem tej aplikacji jest pomóc Ci w budowaniu nawyku regularnego prowadzenia dziennika.

Możesz edytować lub usunąć ten wpis. Kliknij przycisk 'Nowy wpis', aby rozpocząć swoją historię.";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A row of `journal_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload. `id` and timestamps are assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateJournalEntryRequest {
    pub content: String,
    pub user_id: UserId,
}

/// Partial update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateJournalEntryRequest {
    pub content: String,
}

/// A row of `user_streaks`. Maintained entirely server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStreak {
    pub user_id: UserId,
    #[serde(default)]
    pub current_streak: i32,
    #[serde(default)]
    pub longest_streak: i32,
    #[serde(default)]
    pub last_entry_date: Option<chrono::NaiveDate>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Entry content must contain at least one non-whitespace character.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation("Wpis nie może być pusty.".into()));
    }
    Ok(())
}

impl CreateJournalEntryRequest {
    pub fn new(user_id: UserId, content: impl Into<String>) -> Result<Self, CoreError> {
        let content = content.into();
        validate_content(&content)?;
        Ok(Self { content, user_id })
    }
}

impl UpdateJournalEntryRequest {
    pub fn new(content: impl Into<String>) -> Result<Self, CoreError> {
        let content = content.into();
        validate_content(&content)?;
        Ok(Self { content })
    }
}

// ---------------------------------------------------------------------------
// Text metrics
// ---------------------------------------------------------------------------

/// Number of characters (Unicode scalar values) in the content.
pub fn character_count(content: &str) -> usize {
    content.chars().count()
}

/// Number of words, splitting on spaces, tabs and line breaks.
pub fn word_count(content: &str) -> usize {
    content
        .split([' ', '\n', '\r', '\t'])
        .filter(|word| !word.is_empty())
        .count()
}
