//! Note repository and history log over a document store

mod history;
mod notes;

pub use history::{HistoryLog, HISTORY_COLLECTION};
pub use notes::NoteRepository;

/// Top-level collection holding current note state
pub const NOTES_COLLECTION: &str = "notes";
