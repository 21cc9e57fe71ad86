//! Document store adapter contract and bundled implementations
//!
//! The note core only talks to storage through [`DocumentStore`]: keyed
//! documents grouped in collections (optionally nested under a parent
//! document), atomic write batches, and push-based collection snapshots.

mod memory;
mod migrations;
mod sqlite;
mod subscription;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use subscription::Subscription;

pub(crate) use subscription::SubscriptionHub;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Field map stored for one document
pub type Fields = serde_json::Map<String, Value>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    /// Target document does not exist
    #[error("Document {id} not found in {path}")]
    NotFound { path: String, id: String },

    /// Document no longer matches the state the write was based on
    #[error("Document {id} in {path} changed since it was read")]
    Conflict { path: String, id: String },

    /// Backend could not complete the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored fields could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Address of a collection, optionally scoped under a parent document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath {
    parent: Option<(String, String)>,
    name: String,
}

impl CollectionPath {
    /// Top-level collection
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            parent: None,
            name: name.into(),
        }
    }

    /// Sub-collection `name` under document `parent_id` of `parent_collection`
    pub fn nested(
        parent_collection: impl Into<String>,
        parent_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            parent: Some((parent_collection.into(), parent_id.into())),
            name: name.into(),
        }
    }

    /// Collection name without the parent prefix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flat key, e.g. `notes` or `notes/<id>/history`
    #[must_use]
    pub fn key(&self) -> String {
        match &self.parent {
            Some((collection, id)) => format!("{collection}/{id}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Build a document from a JSON object; non-object values yield no fields
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(fields) => fields,
            _ => Fields::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Generate a fresh document id (UUID v7, time-sortable)
pub fn new_document_id() -> String {
    Uuid::now_v7().to_string()
}

/// One write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a document under a pre-assigned id
    Create {
        path: CollectionPath,
        id: String,
        fields: Fields,
    },
    /// Merge fields over an existing document
    ///
    /// With `expected` set, the stored fields must equal it exactly or the
    /// batch fails with [`StoreError::Conflict`].
    Update {
        path: CollectionPath,
        id: String,
        fields: Fields,
        expected: Option<Fields>,
    },
    /// Remove an existing document
    Delete { path: CollectionPath, id: String },
}

impl WriteOp {
    /// Collection the write lands in
    #[must_use]
    pub const fn path(&self) -> &CollectionPath {
        match self {
            Self::Create { path, .. } | Self::Update { path, .. } | Self::Delete { path, .. } => {
                path
            }
        }
    }
}

/// Group of writes applied all-or-nothing by [`DocumentStore::commit`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create and return the id the document will get
    pub fn create(&mut self, path: CollectionPath, fields: Fields) -> String {
        let id = new_document_id();
        self.ops.push(WriteOp::Create {
            path,
            id: id.clone(),
            fields,
        });
        id
    }

    /// Queue a merge update; the whole batch fails if the document is absent
    pub fn update(&mut self, path: CollectionPath, id: impl Into<String>, fields: Fields) {
        self.ops.push(WriteOp::Update {
            path,
            id: id.into(),
            fields,
            expected: None,
        });
    }

    /// Queue a merge update that only applies while the document still
    /// holds exactly `expected`
    pub fn update_if(
        &mut self,
        path: CollectionPath,
        id: impl Into<String>,
        expected: Fields,
        fields: Fields,
    ) {
        self.ops.push(WriteOp::Update {
            path,
            id: id.into(),
            fields,
            expected: Some(expected),
        });
    }

    /// Queue a delete; the whole batch fails if the document is absent
    pub fn delete(&mut self, path: CollectionPath, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            path,
            id: id.into(),
        });
    }

    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Distinct collections touched by this batch, in first-write order
    #[must_use]
    pub fn touched_paths(&self) -> Vec<CollectionPath> {
        let mut paths: Vec<CollectionPath> = Vec::new();
        for op in &self.ops {
            if !paths.contains(op.path()) {
                paths.push(op.path().clone());
            }
        }
        paths
    }

    pub(crate) fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Persistent document store consumed by the note core
///
/// Every committed change to a collection must eventually be re-delivered
/// to that collection's subscribers as a full snapshot.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document's fields
    async fn get_document(&self, path: &CollectionPath, id: &str) -> StoreResult<Option<Fields>>;

    /// All documents of a collection in natural (insertion) order
    async fn list_documents(&self, path: &CollectionPath) -> StoreResult<Vec<Document>>;

    /// Apply a batch of writes atomically
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Push-based view of a collection: the current contents first, then a
    /// fresh snapshot after every change
    async fn subscribe(&self, path: &CollectionPath) -> StoreResult<Subscription>;

    /// Insert a document and return its store-assigned id
    async fn create_document(&self, path: &CollectionPath, fields: Fields) -> StoreResult<String> {
        let mut batch = WriteBatch::new();
        let id = batch.create(path.clone(), fields);
        self.commit(batch).await?;
        Ok(id)
    }

    /// Merge `fields` over an existing document
    async fn update_document(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.update(path.clone(), id, fields);
        self.commit(batch).await
    }

    /// Remove an existing document
    async fn delete_document(&self, path: &CollectionPath, id: &str) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone(), id);
        self.commit(batch).await
    }
}

/// Fail with `Conflict` unless `current` matches the expected fields
pub(crate) fn check_expected(
    path: &CollectionPath,
    id: &str,
    current: &Fields,
    expected: Option<&Fields>,
) -> StoreResult<()> {
    match expected {
        Some(expected) if expected != current => Err(StoreError::Conflict {
            path: path.key(),
            id: id.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Merge `update` over `base`, field by field
pub(crate) fn merge_fields(base: &mut Fields, update: Fields) {
    for (key, value) in update {
        base.insert(key, value);
    }
}
