//! Live view of the note collection, driven by store snapshots
//!
//! The view never reads the store on its own. Every change arrives as a
//! complete snapshot pushed through a [`Subscription`](crate::store::Subscription)
//! and replaces the held notes wholesale, so a write is only visible here
//! once the store has delivered the next snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{HistoryEntry, Note, NoteId};
use crate::repo::NoteRepository;
use crate::store::{Document, DocumentStore};

/// History log contents loaded for the one note being inspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub note_id: NoteId,
    pub entries: Vec<HistoryEntry>,
}

/// Latest full snapshot of current notes plus history-view state
#[derive(Debug, Default)]
pub struct LiveView {
    notes: Vec<Note>,
    snapshots_applied: u64,
    history: Option<HistoryView>,
}

/// View shared between the projector task and its readers
pub type SharedView = Arc<RwLock<LiveView>>;

impl LiveView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh view for sharing with a [`Projector`]
    pub fn shared() -> SharedView {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replace the held notes with `snapshot`
    ///
    /// Documents that do not decode are skipped so one bad record cannot
    /// hide the rest of the collection. Returns the new snapshot count.
    pub fn apply_snapshot(&mut self, snapshot: &[Document]) -> u64 {
        self.notes = snapshot
            .iter()
            .filter_map(|document| match Note::from_document(document) {
                Ok(note) => Some(note),
                Err(error) => {
                    tracing::warn!(document_id = %document.id, %error, "Skipping malformed note");
                    None
                }
            })
            .collect();
        self.snapshots_applied += 1;
        tracing::debug!(
            notes = self.notes.len(),
            revision = self.snapshots_applied,
            "Applied note snapshot"
        );
        self.snapshots_applied
    }

    /// Notes from the most recent snapshot, in store order
    pub fn current_notes(&self) -> &[Note] {
        &self.notes
    }

    /// Number of snapshots applied so far
    pub const fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    /// Show `entries` as the history of `note_id`, replacing any other note's
    pub fn show_history(&mut self, note_id: NoteId, entries: Vec<HistoryEntry>) {
        self.history = Some(HistoryView { note_id, entries });
    }

    pub fn hide_history(&mut self) {
        self.history = None;
    }

    pub const fn history_view(&self) -> Option<&HistoryView> {
        self.history.as_ref()
    }

    /// Whether the history of `note_id` is the one currently shown
    pub fn is_viewing_history(&self, note_id: &NoteId) -> bool {
        self.history
            .as_ref()
            .is_some_and(|view| view.note_id == *note_id)
    }
}

/// Background task feeding note snapshots into a [`LiveView`]
///
/// Snapshots are applied one at a time in delivery order. Dropping the
/// projector stops the task and ends the subscription.
pub struct Projector {
    view: SharedView,
    revisions: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl Projector {
    /// Subscribe to the notes collection and start projecting into `view`
    ///
    /// The initial snapshot is applied before this returns.
    pub async fn spawn(store: Arc<dyn DocumentStore>, view: SharedView) -> Result<Self> {
        let mut subscription = store.subscribe(&NoteRepository::path()).await?;
        let initial = subscription.next().await.ok_or_else(|| {
            Error::StoreUnavailable("note subscription closed before first snapshot".into())
        })?;
        let revision = apply(&view, &initial);
        let (sender, revisions) = watch::channel(revision);

        let task_view = Arc::clone(&view);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                sender.send_replace(apply(&task_view, &snapshot));
            }
            tracing::debug!("Note subscription closed");
        });

        Ok(Self {
            view,
            revisions,
            task,
        })
    }

    pub const fn view(&self) -> &SharedView {
        &self.view
    }

    /// Receiver that changes after every applied snapshot
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revisions.clone()
    }

    /// Stop projecting; the view keeps its last snapshot
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Projector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn apply(view: &SharedView, snapshot: &[Document]) -> u64 {
    view.write()
        .unwrap_or_else(PoisonError::into_inner)
        .apply_snapshot(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{ActorId, Category, NoteDraft};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn note_document(id: &str, title: &str) -> Document {
        Document::new(
            id,
            json!({ "title": title, "category": "work", "ownerId": "alice", "updatedAt": 1 }),
        )
    }

    fn titles(view: &SharedView) -> Vec<String> {
        view.read()
            .unwrap()
            .current_notes()
            .iter()
            .map(|note| note.title.clone())
            .collect()
    }

    async fn wait_for(revisions: &mut watch::Receiver<u64>, target: u64) {
        tokio::time::timeout(Duration::from_secs(5), revisions.wait_for(|rev| *rev >= target))
            .await
            .expect("timed out waiting for snapshot")
            .expect("projector stopped");
    }

    #[test]
    fn test_apply_snapshot_replaces_wholesale() {
        let mut view = LiveView::new();
        view.apply_snapshot(&[note_document("a", "A"), note_document("b", "B")]);
        assert_eq!(view.current_notes().len(), 2);

        let revision = view.apply_snapshot(&[note_document("c", "C")]);
        assert_eq!(revision, 2);
        assert_eq!(view.current_notes().len(), 1);
        assert_eq!(view.current_notes()[0].title, "C");
    }

    #[test]
    fn test_apply_snapshot_skips_malformed_documents() {
        let mut view = LiveView::new();
        view.apply_snapshot(&[
            note_document("a", "A"),
            Document::new("bad", json!({ "title": "X", "category": "errands" })),
            note_document("b", "B"),
        ]);
        let ids: Vec<&str> = view.current_notes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_history_view_holds_one_note() {
        let mut view = LiveView::new();
        let first = NoteId::from("a".to_string());
        let second = NoteId::from("b".to_string());

        view.show_history(first.clone(), Vec::new());
        assert!(view.is_viewing_history(&first));

        view.show_history(second.clone(), Vec::new());
        assert!(!view.is_viewing_history(&first));
        assert!(view.is_viewing_history(&second));

        view.hide_history();
        assert!(view.history_view().is_none());
    }

    #[tokio::test]
    async fn test_projector_follows_store_writes() {
        let store = Arc::new(MemoryStore::new());
        let repo = NoteRepository::new(store.clone(), Arc::new(ManualClock::new(1)));
        let alice = ActorId::from("alice");
        let existing = repo
            .create(&NoteDraft::new("Existing", "", Category::Work), &alice)
            .await
            .unwrap();

        let view = LiveView::shared();
        let projector = Projector::spawn(store.clone(), Arc::clone(&view))
            .await
            .unwrap();
        assert_eq!(titles(&view), vec!["Existing"]);

        let mut revisions = projector.revisions();
        let base = *revisions.borrow();
        repo.create(&NoteDraft::new("Second", "", Category::Personal), &alice)
            .await
            .unwrap();
        wait_for(&mut revisions, base + 1).await;
        assert_eq!(titles(&view), vec!["Existing", "Second"]);

        repo.delete(&existing.id, &alice).await.unwrap();
        wait_for(&mut revisions, base + 2).await;
        assert_eq!(titles(&view), vec!["Second"]);
    }

    #[tokio::test]
    async fn test_stopped_projector_keeps_last_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let repo = NoteRepository::new(store.clone(), Arc::new(ManualClock::new(1)));
        let alice = ActorId::from("alice");
        repo.create(&NoteDraft::new("Kept", "", Category::Work), &alice)
            .await
            .unwrap();

        let view = LiveView::shared();
        let projector = Projector::spawn(store.clone(), Arc::clone(&view))
            .await
            .unwrap();
        projector.stop();

        repo.create(&NoteDraft::new("Unseen", "", Category::Work), &alice)
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(titles(&view), vec!["Kept"]);
    }
}
