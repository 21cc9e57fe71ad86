//! Caller-facing session over a store, a clock and one acting identity

use std::sync::{Arc, PoisonError, RwLockReadGuard};

use tokio::sync::watch;

use crate::clock::Clock;
use crate::error::Result;
use crate::filter::filter_by_category;
use crate::guard;
use crate::models::{ActorId, Category, HistoryEntry, Note, NoteDraft, NoteId};
use crate::projector::{HistoryView, LiveView, Projector, SharedView};
use crate::repo::NoteRepository;
use crate::store::DocumentStore;

/// Note operations performed on behalf of one actor, plus the live view
/// they eventually show up in
///
/// Writes never touch the view directly. A caller reading
/// [`current_notes`](Self::current_notes) right after a write may see the
/// previous state until the store pushes the next snapshot; use
/// [`revisions`](Self::revisions) to wait for it.
pub struct NotesSession {
    repo: NoteRepository,
    actor: ActorId,
    view: SharedView,
    projector: Projector,
    category_filter: Option<Category>,
}

impl NotesSession {
    /// Start a session and load the initial note snapshot
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        actor: ActorId,
    ) -> Result<Self> {
        let repo = NoteRepository::new(Arc::clone(&store), clock);
        let view = LiveView::shared();
        let projector = Projector::spawn(store, Arc::clone(&view)).await?;
        tracing::debug!(actor = %actor, "Opened notes session");
        Ok(Self {
            repo,
            actor,
            view,
            projector,
            category_filter: None,
        })
    }

    pub const fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub const fn repository(&self) -> &NoteRepository {
        &self.repo
    }

    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        self.repo.create(draft, &self.actor).await
    }

    pub async fn update_note(&self, id: &NoteId, draft: &NoteDraft) -> Result<()> {
        self.repo.update(id, draft, &self.actor).await
    }

    pub async fn delete_note(&self, id: &NoteId) -> Result<()> {
        self.repo.delete(id, &self.actor).await
    }

    /// Revert `id` to `entry` and close the history view
    pub async fn revert_note(&self, id: &NoteId, entry: &HistoryEntry) -> Result<()> {
        self.repo.revert(id, entry).await?;
        self.view_mut(LiveView::hide_history);
        Ok(())
    }

    /// Toggle the history view for `id`
    ///
    /// Asking for the note already shown hides it and returns nothing.
    /// Asking for another note loads and shows its entries instead.
    pub async fn view_history(&self, id: &NoteId) -> Result<Vec<HistoryEntry>> {
        if self.read_view().is_viewing_history(id) {
            self.view_mut(LiveView::hide_history);
            return Ok(Vec::new());
        }

        let entries = self.repo.history().list(id).await?;
        let shown = entries.clone();
        self.view_mut(|view| view.show_history(id.clone(), shown));
        Ok(entries)
    }

    /// History currently shown, if any
    pub fn history_view(&self) -> Option<HistoryView> {
        self.read_view().history_view().cloned()
    }

    pub fn set_category_filter(&mut self, category: Option<Category>) {
        self.category_filter = category;
    }

    pub const fn category_filter(&self) -> Option<Category> {
        self.category_filter
    }

    /// Notes from the latest snapshot
    pub fn current_notes(&self) -> Vec<Note> {
        self.read_view().current_notes().to_vec()
    }

    /// Notes from the latest snapshot narrowed by the category filter
    pub fn current_filtered_notes(&self) -> Vec<Note> {
        filter_by_category(self.read_view().current_notes(), self.category_filter)
    }

    /// Whether this session's actor may delete `note`
    pub fn can_delete(&self, note: &Note) -> bool {
        guard::can_delete(note, &self.actor)
    }

    /// Receiver that changes after every snapshot applied to the view
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.projector.revisions()
    }

    fn read_view(&self) -> RwLockReadGuard<'_, LiveView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn view_mut(&self, update: impl FnOnce(&mut LiveView)) {
        let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut *view);
    }
}
