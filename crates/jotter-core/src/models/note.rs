//! Note model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::store::{Document, Fields};

/// Opaque note identifier, assigned by the document store on creation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("note id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of an authenticated actor
///
/// The core only compares identities; issuing them is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Create an identity from its external string form
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string representation of this identity
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no identity is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Fixed set of note categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Personal,
    Other,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Self; 3] = [Self::Work, Self::Personal, Self::Other];

    /// Stored string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "personal" => Ok(Self::Personal),
            "other" => Ok(Self::Other),
            other => Err(Error::Validation(format!(
                "unknown category '{other}'; expected work|personal|other"
            ))),
        }
    }
}

/// Caller-supplied fields for create and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: Category,
}

impl NoteDraft {
    /// Create a draft from its three editable fields
    pub fn new(title: impl Into<String>, content: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category,
        }
    }

    /// Check the draft against note constraints
    ///
    /// Title must contain non-whitespace text; content may be empty.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title cannot be empty".into()));
        }
        Ok(())
    }
}

/// Current state of one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub category: Category,
    /// Creator identity; never reassigned after creation
    pub owner_id: ActorId,
    /// Unix ms of the last create/update/revert
    pub updated_at: Timestamp,
}

/// Field set persisted for a note document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NoteRecord {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Category,
    #[serde(default)]
    pub owner_id: ActorId,
    pub updated_at: Timestamp,
}

impl NoteRecord {
    pub(crate) fn from_draft(draft: &NoteDraft, owner_id: ActorId, updated_at: Timestamp) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content.clone(),
            category: draft.category,
            owner_id,
            updated_at,
        }
    }

    pub(crate) fn to_fields(&self) -> Result<Fields> {
        super::to_fields(self)
    }
}

/// Field set written by update and revert
///
/// Owner is left out so a merge never reassigns it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NoteEdit<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub category: Category,
    pub updated_at: Timestamp,
}

impl<'a> NoteEdit<'a> {
    pub(crate) fn from_draft(draft: &'a NoteDraft, updated_at: Timestamp) -> Self {
        Self {
            title: &draft.title,
            content: &draft.content,
            category: draft.category,
            updated_at,
        }
    }

    pub(crate) fn to_fields(&self) -> Result<Fields> {
        super::to_fields(self)
    }
}

impl Note {
    /// Decode a note from a store document
    pub fn from_document(document: &Document) -> Result<Self> {
        Self::from_fields(NoteId::from(document.id.clone()), &document.fields)
    }

    pub(crate) fn from_fields(id: NoteId, fields: &Fields) -> Result<Self> {
        let record: NoteRecord = super::from_fields(fields)
            .map_err(|error| Error::Codec(format!("note {id}: {error}")))?;
        Ok(Self {
            id,
            title: record.title,
            content: record.content,
            category: record.category,
            owner_id: record.owner_id,
            updated_at: record.updated_at,
        })
    }

    /// Editable fields of the current state
    #[must_use]
    pub fn draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.content.clone(), self.category)
    }

    /// First line of content truncated to `max_len` characters
    #[must_use]
    pub fn content_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
