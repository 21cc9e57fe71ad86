use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use jotter_core::config::{normalize_text_option, Config};
use jotter_core::store::SqliteStore;
use jotter_core::{ActorId, HistoryEntry, Note, NotesSession, SystemClock};
use serde::Serialize;

use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;

/// Settings resolved from flags, environment and config file
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub user: Option<String>,
}

impl Context {
    pub fn new(cli_db_path: Option<PathBuf>, cli_user: Option<String>, config: &Config) -> Self {
        Self {
            db_path: config.resolved_db_path(cli_db_path),
            user: normalize_text_option(cli_user).or_else(|| config.user.clone()),
        }
    }

    /// Identity for writes; required
    pub fn actor(&self) -> Result<ActorId, CliError> {
        self.user
            .as_deref()
            .map(ActorId::from)
            .ok_or(CliError::MissingUser)
    }

    /// Identity for reads; may be empty
    pub fn reader(&self) -> ActorId {
        self.user.as_deref().map(ActorId::from).unwrap_or_default()
    }

    pub async fn open_session(&self, actor: ActorId) -> Result<NotesSession, CliError> {
        let store = SqliteStore::open(&self.db_path).map_err(jotter_core::Error::from)?;
        Ok(NotesSession::open(Arc::new(store), Arc::new(SystemClock::new()), actor).await?)
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub category: String,
    pub owner_id: String,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListItem {
    pub version: usize,
    pub id: String,
    pub note_id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub owner_id: String,
    pub updated_at: i64,
    pub saved_at: i64,
    pub saved_at_iso: String,
}

/// Find a note by exact id or unique id prefix
pub fn resolve_note(note_query: &str, notes: &[Note]) -> Result<Note, CliError> {
    let query = normalize_note_identifier(note_query)?;
    if let Some(note) = notes.iter().find(|note| note.id.as_str() == query) {
        return Ok(note.clone());
    }

    let matching = notes
        .iter()
        .filter(|note| note.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(query)),
        [note] => Ok((*note).clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(note.id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(note.id.as_str());
            let title = truncate(&note.title, 30);
            let relative_time = format_relative_time(note.updated_at, now_ms);
            format!(
                "{short_id:<13}  {:<8}  {title:<30}  {relative_time:<10}  @{}",
                note.category.as_str(),
                note.owner_id
            )
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: truncate(&note.content_preview(80), 80),
        content: note.content.clone(),
        category: note.category.to_string(),
        owner_id: note.owner_id.to_string(),
        updated_at: note.updated_at,
        relative_time: format_relative_time(note.updated_at, now_ms),
    }
}

/// One line per entry, numbered from 1 in archive order
pub fn format_history_lines(entries: &[HistoryEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "{:>3}  {}  {:<8}  {}",
                index + 1,
                format_timestamp(entry.saved_at),
                entry.category.as_str(),
                truncate(&entry.title, 40)
            )
        })
        .collect()
}

pub fn history_to_list_items(entries: &[HistoryEntry]) -> Vec<HistoryListItem> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| HistoryListItem {
            version: index + 1,
            id: entry.id.clone(),
            note_id: entry.note_id.to_string(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            category: entry.category.to_string(),
            owner_id: entry.owner_id.to_string(),
            updated_at: entry.updated_at,
            saved_at: entry.saved_at,
            saved_at_iso: format_timestamp(entry.saved_at),
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

/// Content from the positional words, else piped stdin, else empty
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    let joined = content_parts.join(" ");
    if !joined.trim().is_empty() {
        return Ok(joined.trim().to_string());
    }
    Ok(read_piped_stdin()?.unwrap_or_default())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_text_option(Some(buffer)))
}
