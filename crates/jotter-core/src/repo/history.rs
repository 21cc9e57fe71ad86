//! Append-only per-note history log

use std::sync::Arc;

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::models::{HistoryEntry, HistoryRecord, Note, NoteId};
use crate::store::{CollectionPath, DocumentStore, WriteBatch};

use super::NOTES_COLLECTION;

/// Sub-collection holding one note's archived snapshots
pub const HISTORY_COLLECTION: &str = "history";

/// Archived prior states of notes, stored under each note document
///
/// Entries are only ever appended. Deleting a note leaves its log in place.
#[derive(Clone)]
pub struct HistoryLog {
    store: Arc<dyn DocumentStore>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Collection path of `note_id`'s log
    pub fn path(note_id: &NoteId) -> CollectionPath {
        CollectionPath::nested(NOTES_COLLECTION, note_id.as_str(), HISTORY_COLLECTION)
    }

    /// Archive `snapshot` as a new entry
    pub async fn append(&self, snapshot: &Note, saved_at: Timestamp) -> Result<HistoryEntry> {
        let mut batch = WriteBatch::new();
        let entry = Self::stage_append(&mut batch, snapshot, saved_at)?;
        self.store
            .commit(batch)
            .await
            .map_err(|error| Error::from_store(error, snapshot.id.clone()))?;
        Ok(entry)
    }

    /// Queue the archive write into `batch` so it commits together with other writes
    pub(crate) fn stage_append(
        batch: &mut WriteBatch,
        snapshot: &Note,
        saved_at: Timestamp,
    ) -> Result<HistoryEntry> {
        let record = HistoryRecord::snapshot(snapshot, saved_at);
        let id = batch.create(Self::path(&snapshot.id), record.to_fields()?);
        Ok(record.into_entry(id))
    }

    /// All entries for `note_id`, oldest archive first
    ///
    /// Sorted by `saved_at`, ties broken by entry id (time-ordered UUIDs), so
    /// the order does not depend on the store's enumeration order.
    pub async fn list(&self, note_id: &NoteId) -> Result<Vec<HistoryEntry>> {
        let documents = self
            .store
            .list_documents(&Self::path(note_id))
            .await
            .map_err(|error| Error::from_store(error, note_id.clone()))?;

        let mut entries = documents
            .iter()
            .map(HistoryEntry::from_document)
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| {
            a.saved_at
                .cmp(&b.saved_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }

    /// Number of archived entries for `note_id`
    pub async fn len(&self, note_id: &NoteId) -> Result<usize> {
        Ok(self.list(note_id).await?.len())
    }
}
