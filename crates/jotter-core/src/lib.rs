//! jotter-core - Core library for Jotter
//!
//! A shared collection of categorized notes with a per-note edit history.
//! Every update archives the state it overwrites, any archived state can be
//! restored, and every change reaches live observers through store
//! subscriptions.

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod guard;
pub mod models;
pub mod projector;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::{Error, Result};
pub use models::{ActorId, Category, HistoryEntry, Note, NoteDraft, NoteId};
pub use service::NotesSession;
