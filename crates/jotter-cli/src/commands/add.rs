use jotter_core::{Category, NoteDraft};

use crate::commands::common::{resolve_note_content, Context};
use crate::error::CliError;

pub async fn run_add(
    context: &Context,
    title: &str,
    category: Category,
    content_parts: &[String],
) -> Result<(), CliError> {
    let actor = context.actor()?;
    let content = resolve_note_content(content_parts)?;

    let session = context.open_session(actor).await?;
    let note = session
        .create_note(&NoteDraft::new(title.trim(), content, category))
        .await?;

    println!("{}", note.id);
    Ok(())
}
