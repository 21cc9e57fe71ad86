//! History entry model

use serde::{Deserialize, Serialize};

use super::note::{ActorId, Category, Note, NoteDraft, NoteId};
use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::store::{Document, Fields};

/// Archived snapshot of a note, taken just before an update overwrote it
///
/// Entries are write-once: nothing in this crate mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Store-assigned id of the entry itself
    pub id: String,
    /// Note this snapshot was taken from
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub owner_id: ActorId,
    /// `updated_at` of the archived state
    pub updated_at: Timestamp,
    /// When the snapshot was archived; never earlier than `updated_at`
    pub saved_at: Timestamp,
}

/// Field set persisted for a history document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryRecord {
    pub note_id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Category,
    #[serde(default)]
    pub owner_id: ActorId,
    pub updated_at: Timestamp,
    pub saved_at: Timestamp,
}

impl HistoryRecord {
    /// Snapshot of `note` as it is right now, archived at `saved_at`
    pub(crate) fn snapshot(note: &Note, saved_at: Timestamp) -> Self {
        Self {
            note_id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category,
            owner_id: note.owner_id.clone(),
            updated_at: note.updated_at,
            saved_at: saved_at.max(note.updated_at),
        }
    }

    pub(crate) fn to_fields(&self) -> Result<Fields> {
        super::to_fields(self)
    }

    pub(crate) fn into_entry(self, id: String) -> HistoryEntry {
        HistoryEntry {
            id,
            note_id: self.note_id,
            title: self.title,
            content: self.content,
            category: self.category,
            owner_id: self.owner_id,
            updated_at: self.updated_at,
            saved_at: self.saved_at,
        }
    }
}

impl HistoryEntry {
    /// Decode an entry from a history document
    pub fn from_document(document: &Document) -> Result<Self> {
        let record: HistoryRecord = super::from_fields(&document.fields)
            .map_err(|error| Error::Codec(format!("history entry {}: {error}", document.id)))?;
        Ok(record.into_entry(document.id.clone()))
    }

    /// Editable fields captured by this snapshot
    #[must_use]
    pub fn draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.content.clone(), self.category)
    }
}
