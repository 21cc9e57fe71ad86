use jotter_core::{Category, NoteDraft};

use crate::commands::common::{resolve_note, Context};
use crate::error::CliError;

pub async fn run_edit(
    context: &Context,
    id: &str,
    title: Option<String>,
    content: Option<String>,
    category: Option<Category>,
) -> Result<(), CliError> {
    let session = context.open_session(context.actor()?).await?;
    let note = resolve_note(id, &session.current_notes())?;

    let draft = apply_edits(note.draft(), title, content, category);
    if draft == note.draft() {
        println!("{}", note.id);
        return Ok(());
    }

    session.update_note(&note.id, &draft).await?;
    println!("{}", note.id);
    Ok(())
}

/// Overlay the supplied fields on `draft`; omitted fields keep their value
pub fn apply_edits(
    mut draft: NoteDraft,
    title: Option<String>,
    content: Option<String>,
    category: Option<Category>,
) -> NoteDraft {
    if let Some(title) = title {
        draft.title = title.trim().to_string();
    }
    if let Some(content) = content {
        draft.content = content;
    }
    if let Some(category) = category {
        draft.category = category;
    }
    draft
}
