//! `SQLite`-backed document store

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{
    check_expected, merge_fields, migrations, CollectionPath, Document, DocumentStore, Fields,
    StoreError, StoreResult, Subscription, SubscriptionHub, WriteBatch, WriteOp,
};

/// How often a file-backed store checks for commits made by other connections
const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connection plus subscribers, shared with blocking workers and the watcher
struct Shared {
    conn: Mutex<Connection>,
    hub: SubscriptionHub,
    /// Last `PRAGMA data_version` seen; only touched under the connection lock
    data_version: AtomicI64,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-publish subscribed collections if another connection committed
    ///
    /// `data_version` only moves for commits made through other connections,
    /// so local commits (which publish themselves) never trigger this.
    fn publish_external_changes(&self) -> StoreResult<usize> {
        let conn = self.lock();
        let version: i64 = conn.query_row("PRAGMA data_version;", [], |row| row.get(0))?;
        if version == self.data_version.swap(version, Ordering::AcqRel) {
            return Ok(0);
        }

        let paths = self.hub.subscribed_paths();
        for path in &paths {
            let documents = list_in(&conn, path)?;
            self.hub.publish(path, &documents);
        }
        drop(conn);
        Ok(paths.len())
    }
}

/// Document store persisted in a single `SQLite` file
///
/// Every collection lives in one `documents` table keyed by the flat
/// collection key; insertion sequence gives the natural enumeration order.
/// Batches run inside one transaction. Queries run on tokio's blocking pool.
///
/// Subscribers of a file-backed store also see commits made by other
/// handles or processes on the same file, picked up by polling.
pub struct SqliteStore {
    shared: Arc<Shared>,
    path: Option<PathBuf>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                StoreError::Unavailable(format!(
                    "failed to create database directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn, Some(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "Opened SQLite document store");
        Ok(store)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?, None)
    }

    /// Database file backing this store, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn bootstrap(mut conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        // In-memory databases answer "memory" instead of switching to WAL.
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        tracing::debug!(journal_mode, "Configured SQLite journal mode");
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::run(&mut conn)?;
        let data_version: i64 = conn.query_row("PRAGMA data_version;", [], |row| row.get(0))?;

        Ok(Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                hub: SubscriptionHub::new(),
                data_version: AtomicI64::new(data_version),
            }),
            path,
            watcher: Mutex::new(None),
        })
    }

    /// Run `work` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Shared) -> StoreResult<T> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || work(&shared))
            .await
            .map_err(|error| StoreError::Unavailable(format!("SQLite worker failed: {error}")))?
    }

    /// Start the external-change watcher once, for file-backed stores only
    fn ensure_watcher(&self) {
        if self.path.is_none() {
            return;
        }
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if watcher.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *watcher = Some(tokio::spawn(watch_external_commits(Arc::downgrade(
            &self.shared,
        ))));
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        let watcher = self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = watcher.take() {
            task.abort();
        }
    }
}

/// Poll for commits from other connections until the store goes away
async fn watch_external_commits(shared: Weak<Shared>) {
    let mut ticker = tokio::time::interval(EXTERNAL_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(store) = shared.upgrade() else {
            break;
        };
        if !store.hub.has_any_subscribers() {
            continue;
        }

        let result = tokio::task::spawn_blocking(move || store.publish_external_changes()).await;
        match result {
            Ok(Ok(0)) => {}
            Ok(Ok(published)) => {
                tracing::debug!(collections = published, "Published external SQLite changes");
            }
            Ok(Err(error)) => tracing::warn!(%error, "Failed to check for external SQLite changes"),
            Err(error) => {
                tracing::warn!(%error, "External change watcher stopped");
                break;
            }
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_document(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Fields>> {
        let path = path.clone();
        let id = id.to_string();
        self.with_conn(move |shared| get_fields(&shared.lock(), &path, &id))
            .await
    }

    async fn list_documents(&self, path: &CollectionPath) -> StoreResult<Vec<Document>> {
        let path = path.clone();
        self.with_conn(move |shared| list_in(&shared.lock(), &path))
            .await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.with_conn(move |shared| {
            let touched = batch.touched_paths();
            let mut conn = shared.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            for op in batch.into_ops() {
                apply(&tx, op)?;
            }

            let mut snapshots = Vec::new();
            for path in touched {
                if shared.hub.has_subscribers(&path) {
                    let documents = list_in(&tx, &path)?;
                    snapshots.push((path, documents));
                }
            }
            tx.commit()?;

            // Still holding the connection lock, so snapshots go out in commit order.
            for (path, documents) in &snapshots {
                shared.hub.publish(path, documents);
            }
            drop(conn);
            Ok(())
        })
        .await
    }

    async fn subscribe(&self, path: &CollectionPath) -> StoreResult<Subscription> {
        let path = path.clone();
        let subscription = self
            .with_conn(move |shared| {
                let conn = shared.lock();
                let initial = list_in(&conn, &path)?;
                Ok(shared.hub.subscribe(&path, initial))
            })
            .await?;
        self.ensure_watcher();
        Ok(subscription)
    }
}

fn apply(conn: &Connection, op: WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Create { path, id, fields } => {
            conn.execute(
                "INSERT INTO documents (collection, id, fields) VALUES (?1, ?2, ?3)
                 ON CONFLICT(collection, id) DO UPDATE SET fields = excluded.fields",
                params![path.key(), id, serde_json::to_string(&fields)?],
            )?;
        }
        WriteOp::Update {
            path,
            id,
            fields,
            expected,
        } => {
            let mut current =
                get_fields(conn, &path, &id)?.ok_or_else(|| not_found(&path, &id))?;
            check_expected(&path, &id, &current, expected.as_ref())?;
            merge_fields(&mut current, fields);
            conn.execute(
                "UPDATE documents SET fields = ?3 WHERE collection = ?1 AND id = ?2",
                params![path.key(), id, serde_json::to_string(&current)?],
            )?;
        }
        WriteOp::Delete { path, id } => {
            let rows = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![path.key(), id],
            )?;
            if rows == 0 {
                return Err(not_found(&path, &id));
            }
        }
    }
    Ok(())
}

fn get_fields(conn: &Connection, path: &CollectionPath, id: &str) -> StoreResult<Option<Fields>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2",
            params![path.key(), id],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|raw| serde_json::from_str::<Fields>(&raw))
        .transpose()
        .map_err(StoreError::from)
}

fn list_in(conn: &Connection, path: &CollectionPath) -> StoreResult<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, fields FROM documents
         WHERE collection = ?1
         ORDER BY seq ASC",
    )?;

    let rows = stmt
        .query_map(params![path.key()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, raw)| -> StoreResult<Document> {
            Ok(Document {
                id,
                fields: serde_json::from_str(&raw)?,
            })
        })
        .collect()
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
    use tempfile::tempdir;

    fn fields(value: serde_json::Value) -> Fields {
        Document::new("", value).fields
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.path().is_none());
        assert!(store
            .list_documents(&CollectionPath::root("notes"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
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
    }

    #[tokio::test]
    async fn test_nested_collections_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        let notes = CollectionPath::root("notes");
        let history = CollectionPath::nested("notes", "n1", "history");
        store.create_document(&notes, Fields::new()).await.unwrap();
        store.create_document(&history, Fields::new()).await.unwrap();
        store.create_document(&history, Fields::new()).await.unwrap();

        assert_eq!(store.list_documents(&notes).await.unwrap().len(), 1);
        assert_eq!(store.list_documents(&history).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let history = CollectionPath::nested("notes", "missing", "history");
        let mut batch = WriteBatch::new();
        batch.create(history.clone(), fields(json!({ "title": "T1" })));
        batch.update(CollectionPath::root("notes"), "missing", Fields::new());

        let error = store.commit(batch).await.unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
        assert!(store.list_documents(&history).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let error = store
            .delete_document(&CollectionPath::root("notes"), "nope")
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("jotter.db");
        let notes = CollectionPath::root("notes");

        let id = {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .create_document(&notes, fields(json!({ "title": "kept" })))
                .await
                .unwrap()
        };

        let reopened = SqliteStore::open(&db_path).unwrap();
        let stored = reopened.get_document(&notes, &id).await.unwrap().unwrap();
        assert_eq!(stored.get("title"), Some(&json!("kept")));
    }

    #[tokio::test]
    async fn test_stale_expected_fields_are_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
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

        let current = store.get_document(&notes, &id).await.unwrap().unwrap();
        let mut batch = WriteBatch::new();
        batch.update_if(notes.clone(), id.clone(), current, fields(json!({ "title": "T3" })));
        store.commit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscription_sees_commits_from_other_handle() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("jotter.db");
        let reader = SqliteStore::open(&db_path).unwrap();
        let writer = SqliteStore::open(&db_path).unwrap();
        let notes = CollectionPath::root("notes");

        let mut subscription = reader.subscribe(&notes).await.unwrap();
        assert!(subscription.next().await.unwrap().is_empty());

        let id = writer
            .create_document(&notes, fields(json!({ "title": "remote" })))
            .await
            .unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), subscription.next())
            .await
            .expect("no snapshot after commit on another handle")
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_commit_waiting_on_lock_leaves_runtime_free() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("jotter.db");
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let notes = CollectionPath::root("notes");

        let other = Connection::open(&db_path).unwrap();
        other.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let started = std::time::Instant::now();
        let pending = tokio::spawn({
            let store = Arc::clone(&store);
            let notes = notes.clone();
            async move { store.create_document(&notes, Fields::new()).await }
        });

        // Only one runtime thread: this timer fires only if the commit is off it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        other.execute_batch("COMMIT;").unwrap();

        pending.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(store.list_documents(&notes).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_receives_committed_snapshots() {
        let store = SqliteStore::open_in_memory().unwrap();
        let notes = CollectionPath::root("notes");
        let mut subscription = store.subscribe(&notes).await.unwrap();
        assert!(subscription.next().await.unwrap().is_empty());

        let id = store.create_document(&notes, Fields::new()).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
    }
}
