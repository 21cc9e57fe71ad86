//! Ownership checks for note mutations

use crate::models::{ActorId, Note};

/// Whether `actor` may delete `note`
///
/// Only the creator may delete. A note without an owner cannot be deleted by
/// anyone. This is a caller-side predicate, not an access-control layer: the
/// store must enforce ownership on its own.
pub fn can_delete(note: &Note, actor: &ActorId) -> bool {
    !note.owner_id.is_empty() && note.owner_id == *actor
}
