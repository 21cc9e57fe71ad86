use crate::commands::common::{
    format_history_lines, history_to_list_items, resolve_note, Context,
};
use crate::error::CliError;

pub async fn run_history(context: &Context, id: &str, as_json: bool) -> Result<(), CliError> {
    let session = context.open_session(context.reader()).await?;
    let note = resolve_note(id, &session.current_notes())?;
    let entries = session.view_history(&note.id).await?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&history_to_list_items(&entries))?
        );
    } else if entries.is_empty() {
        println!("No earlier versions of {}", note.id);
    } else {
        for line in format_history_lines(&entries) {
            println!("{line}");
        }
    }

    Ok(())
}
