//! Data models for Jotter

mod history;
mod note;

pub use history::HistoryEntry;
pub use note::{ActorId, Category, Note, NoteDraft, NoteId};

pub(crate) use history::HistoryRecord;
pub(crate) use note::{NoteEdit, NoteRecord};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::Fields;

/// Serialize a record into a document field map
fn to_fields<T: Serialize>(record: &T) -> Result<Fields> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(Error::Codec(format!(
            "record serialized to non-object value: {other}"
        ))),
        Err(error) => Err(Error::Codec(error.to_string())),
    }
}

/// Deserialize a record from a document field map
fn from_fields<T: DeserializeOwned>(fields: &Fields) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(fields.clone()))
}
