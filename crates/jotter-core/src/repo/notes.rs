//! Note repository: create, update with archival, revert, and delete

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::guard::can_delete;
use crate::models::{ActorId, HistoryEntry, Note, NoteDraft, NoteEdit, NoteId, NoteRecord};
use crate::store::{CollectionPath, DocumentStore, WriteBatch};

use super::history::HistoryLog;
use super::NOTES_COLLECTION;

/// Mutations and reads of current note state
#[derive(Clone)]
pub struct NoteRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    history: HistoryLog,
}

impl NoteRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let history = HistoryLog::new(Arc::clone(&store));
        Self {
            store,
            clock,
            history,
        }
    }

    /// Collection holding current note documents
    pub fn path() -> CollectionPath {
        CollectionPath::root(NOTES_COLLECTION)
    }

    /// History log backing this repository
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Create a note owned by `owner`
    pub async fn create(&self, draft: &NoteDraft, owner: &ActorId) -> Result<Note> {
        draft.validate()?;
        if owner.is_empty() {
            return Err(Error::Validation("owner identity cannot be empty".into()));
        }

        let updated_at = self.clock.now();
        let record = NoteRecord::from_draft(draft, owner.clone(), updated_at);
        let id = self
            .store
            .create_document(&Self::path(), record.to_fields()?)
            .await?;

        let note = Note {
            id: NoteId::from(id),
            title: record.title,
            content: record.content,
            category: record.category,
            owner_id: record.owner_id,
            updated_at,
        };
        tracing::info!(note_id = %note.id, owner = %note.owner_id, "Created note");
        Ok(note)
    }

    /// Current state of `id`, if it exists
    pub async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let fields = self.store.get_document(&Self::path(), id.as_str()).await?;
        fields
            .map(|fields| Note::from_fields(id.clone(), &fields))
            .transpose()
    }

    /// Current state of `id`, or `NotFound`
    pub async fn require(&self, id: &NoteId) -> Result<Note> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// All current notes in the store's natural order
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.store
            .list_documents(&Self::path())
            .await?
            .iter()
            .map(Note::from_document)
            .collect()
    }

    /// Archive the current state of `id`, then overwrite it with `draft`
    ///
    /// Both writes land in one batch: either the archive entry and the new
    /// state are both stored, or neither is. The owner is never reassigned.
    /// If another write changed the note after it was read, nothing is
    /// stored and the call fails with [`Error::Conflict`].
    pub async fn update(&self, id: &NoteId, draft: &NoteDraft, actor: &ActorId) -> Result<()> {
        draft.validate()?;
        let read = self
            .store
            .get_document(&Self::path(), id.as_str())
            .await?
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        let current = Note::from_fields(id.clone(), &read)?;
        if current.owner_id != *actor {
            tracing::debug!(
                note_id = %id,
                owner = %current.owner_id,
                actor = %actor,
                "Update by non-owner keeps the stored owner"
            );
        }

        let now = self.clock.now();
        let mut batch = WriteBatch::new();
        let archived = HistoryLog::stage_append(&mut batch, &current, now)?;
        batch.update_if(
            Self::path(),
            id.as_str(),
            read,
            NoteEdit::from_draft(draft, now).to_fields()?,
        );

        self.store
            .commit(batch)
            .await
            .map_err(|error| Error::from_store(error, id.clone()))?;
        tracing::info!(note_id = %id, history_id = %archived.id, "Updated note");
        Ok(())
    }

    /// Delete `id` if `actor` owns it; its history log is left in place
    pub async fn delete(&self, id: &NoteId, actor: &ActorId) -> Result<()> {
        let note = self.require(id).await?;
        if !can_delete(&note, actor) {
            tracing::warn!(note_id = %id, actor = %actor, "Delete denied for non-owner");
            return Err(Error::Permission {
                note_id: id.clone(),
                actor: actor.to_string(),
            });
        }

        self.store
            .delete_document(&Self::path(), id.as_str())
            .await
            .map_err(|error| Error::from_store(error, id.clone()))?;
        tracing::info!(note_id = %id, "Deleted note");
        Ok(())
    }

    /// Overwrite `id` with the fields of `snapshot`
    ///
    /// The state being replaced is not archived.
    pub async fn revert(&self, id: &NoteId, snapshot: &HistoryEntry) -> Result<()> {
        if snapshot.note_id != *id {
            return Err(Error::Validation(format!(
                "history entry {} belongs to note {}, not {id}",
                snapshot.id, snapshot.note_id
            )));
        }

        let draft = snapshot.draft();
        draft.validate()?;
        let fields = NoteEdit::from_draft(&draft, self.clock.now()).to_fields()?;
        self.store
            .update_document(&Self::path(), id.as_str(), fields)
            .await
            .map_err(|error| Error::from_store(error, id.clone()))?;
        tracing::info!(note_id = %id, history_id = %snapshot.id, "Reverted note");
        Ok(())
    }
}
