use crate::commands::common::{resolve_note, Context};
use crate::error::CliError;

pub async fn run_delete(context: &Context, id: &str) -> Result<(), CliError> {
    let session = context.open_session(context.actor()?).await?;
    let note = resolve_note(id, &session.current_notes())?;

    session.delete_note(&note.id).await?;
    println!("{}", note.id);
    Ok(())
}
