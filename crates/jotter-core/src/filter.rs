//! Category filter over the current note list

use crate::models::{Category, Note};

/// Notes whose category equals `category`, in their original relative order
///
/// With no category selected the list is returned unchanged.
pub fn filter_by_category(notes: &[Note], category: Option<Category>) -> Vec<Note> {
    match category {
        Some(category) => notes
            .iter()
            .filter(|note| note.category == category)
            .cloned()
            .collect(),
        None => notes.to_vec(),
    }
}
