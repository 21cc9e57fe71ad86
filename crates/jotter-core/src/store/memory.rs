//! In-process document store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    check_expected, merge_fields, CollectionPath, Document, DocumentStore, Fields, StoreError, StoreResult,
    Subscription, SubscriptionHub, WriteBatch, WriteOp,
};

type Collections = BTreeMap<CollectionPath, Vec<Document>>;

/// Document store kept entirely in memory
///
/// Collections keep insertion order. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    hub: SubscriptionHub,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every request fails with
    /// [`StoreError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Fields>> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(path)
            .and_then(|documents| documents.iter().find(|document| document.id == id))
            .map(|document| document.fields.clone()))
    }

    async fn list_documents(&self, path: &CollectionPath) -> StoreResult<Vec<Document>> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections.get(path).cloned().unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.ensure_online()?;
        if batch.is_empty() {
            return Ok(());
        }

        let touched = batch.touched_paths();
        let mut collections = self.collections.write().await;

        // Stage the touched collections so a failing write leaves nothing behind.
        let mut staged: Collections = touched
            .iter()
            .map(|path| (path.clone(), collections.get(path).cloned().unwrap_or_default()))
            .collect();
        for op in batch.into_ops() {
            apply(&mut staged, op)?;
        }

        for (path, documents) in staged {
            self.hub.publish(&path, &documents);
            if documents.is_empty() {
                collections.remove(&path);
            } else {
                collections.insert(path, documents);
            }
        }

        tracing::debug!(collections = touched.len(), "Memory store batch committed");
        Ok(())
    }

    async fn subscribe(&self, path: &CollectionPath) -> StoreResult<Subscription> {
        self.ensure_online()?;
        // Hold the read lock so no commit can slip between snapshot and registration.
        let collections = self.collections.read().await;
        let initial = collections.get(path).cloned().unwrap_or_default();
        Ok(self.hub.subscribe(path, initial))
    }
}

fn apply(staged: &mut Collections, op: WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Create { path, id, fields } => {
            let documents = staged.entry(path).or_default();
            if let Some(existing) = documents.iter_mut().find(|document| document.id == id) {
                existing.fields = fields;
            } else {
                documents.push(Document { id, fields });
            }
        }
        WriteOp::Update {
            path,
            id,
            fields,
            expected,
        } => {
            let existing = staged
                .get_mut(&path)
                .and_then(|documents| documents.iter_mut().find(|document| document.id == id))
                .ok_or_else(|| not_found(&path, &id))?;
            check_expected(&path, &id, &existing.fields, expected.as_ref())?;
            merge_fields(&mut existing.fields, fields);
        }
        WriteOp::Delete { path, id } => {
            let documents = staged.get_mut(&path).ok_or_else(|| not_found(&path, &id))?;
            let position = documents
                .iter()
                .position(|document| document.id == id)
                .ok_or_else(|| not_found(&path, &id))?;
            documents.remove(position);
        }
    }
    Ok(())
}

fn not_found(path: &CollectionPath, id: &str) -> StoreError {
    StoreError::NotFound {
        path: path.key(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        Document::new("", value).fields
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes");

        let id = store
            .create_document(&notes, fields(json!({ "title": "T1", "content": "C1" })))
            .await
            .unwrap();
        store
            .update_document(&notes, &id, fields(json!({ "title": "T2" })))
            .await
            .unwrap();

        let stored = store.get_document(&notes, &id).await.unwrap().unwrap();
        assert_eq!(
            serde_json::Value::Object(stored),
            json!({ "title": "T2", "content": "C1" })
        );

        store.delete_document(&notes, &id).await.unwrap();
        assert!(store.get_document(&notes, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes");
        let first = store.create_document(&notes, Fields::new()).await.unwrap();
        let second = store.create_document(&notes, Fields::new()).await.unwrap();
        let third = store.create_document(&notes, Fields::new()).await.unwrap();

        let ids: Vec<String> = store
            .list_documents(&notes)
            .await
            .unwrap()
            .into_iter()
            .map(|document| document.id)
            .collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes");
        let history = CollectionPath::nested("notes", "missing", "history");

        let mut batch = WriteBatch::new();
        batch.create(history.clone(), fields(json!({ "title": "T1" })));
        batch.update(notes.clone(), "missing", fields(json!({ "title": "T2" })));

        let error = store.commit(batch).await.unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
        assert!(store.list_documents(&history).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_expected_fields_reject_whole_batch() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes");
        let id = store
            .create_document(&notes, fields(json!({ "title": "T1" })))
            .await
            .unwrap();
        let read = store.get_document(&notes, &id).await.unwrap().unwrap();
        store
            .update_document(&notes, &id, fields(json!({ "title": "T2" })))
            .await
            .unwrap();

        let history = CollectionPath::nested("notes", id.clone(), "history");
        let mut batch = WriteBatch::new();
        batch.create(history.clone(), read.clone());
        batch.update_if(notes.clone(), id.clone(), read, fields(json!({ "title": "T3" })));

        let error = store.commit(batch).await.unwrap_err();
        assert!(matches!(error, StoreError::Conflict { .. }));
        assert!(store.list_documents(&history).await.unwrap().is_empty());
        let stored = store.get_document(&notes, &id).await.unwrap().unwrap();
        assert_eq!(stored.get("title"), Some(&json!("T2")));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let error = store
            .update_document(&CollectionPath::root("notes"), "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscribers_see_initial_state_and_each_commit() {
        let store = MemoryStore::new();
        let notes = CollectionPath::root("notes");
        let id = store.create_document(&notes, Fields::new()).await.unwrap();

        let mut subscription = store.subscribe(&notes).await.unwrap();
        let initial = subscription.next().await.unwrap();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].id, id);

        store.create_document(&notes, Fields::new()).await.unwrap();
        assert_eq!(subscription.next().await.unwrap().len(), 2);

        store.delete_document(&notes, &id).await.unwrap();
        assert_eq!(subscription.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let error = store
            .list_documents(&CollectionPath::root("notes"))
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::Unavailable(_)));

        store.set_offline(false);
        assert!(store
            .list_documents(&CollectionPath::root("notes"))
            .await
            .is_ok());
    }
}
