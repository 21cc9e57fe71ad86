//! Error types for jotter-core

use thiserror::Error;

use crate::models::NoteId;
use crate::store::StoreError;

/// Result type alias using jotter-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by note store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input fields violate the note constraints
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation targets a note that does not exist
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    /// Actor is not allowed to perform the mutation
    #[error("Permission denied: {actor} does not own note {note_id}")]
    Permission {
        /// Note the actor tried to mutate
        note_id: NoteId,
        /// Identity of the rejected actor
        actor: String,
    },

    /// The note changed between read and write; re-read and retry
    #[error("Note {0} was changed concurrently")]
    Conflict(NoteId),

    /// The document store failed to complete a read or write
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document does not decode into a note or history entry
    #[error("Invalid persisted data: {0}")]
    Codec(String),
}

impl Error {
    /// Maps a store failure onto the core taxonomy for the given note.
    pub(crate) fn from_store(error: StoreError, note_id: NoteId) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::NotFound(note_id),
            StoreError::Conflict { .. } => Self::Conflict(note_id),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}
