use crate::commands::common::{resolve_note, Context};
use crate::error::CliError;

/// Revert to version `index` (1-based, as printed by `history`)
pub async fn run_revert(context: &Context, id: &str, index: usize) -> Result<(), CliError> {
    let session = context.open_session(context.actor()?).await?;
    let note = resolve_note(id, &session.current_notes())?;
    let entries = session.repository().history().list(&note.id).await?;

    let Some(entry) = index.checked_sub(1).and_then(|position| entries.get(position)) else {
        return Err(CliError::NoSuchVersion {
            note_id: note.id.to_string(),
            index,
            available: entries.len(),
        });
    };

    session.revert_note(&note.id, entry).await?;
    println!("{}", note.id);
    Ok(())
}
