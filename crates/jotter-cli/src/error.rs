use std::io;

use jotter_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] jotter_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("No acting user. Pass --user or set JOTTER_USER.")]
    MissingUser,
    #[error("Note {note_id} has no version {index} (versions: {available})")]
    NoSuchVersion {
        note_id: String,
        index: usize,
        available: usize,
    },
}
