use jotter_core::Category;

use crate::commands::common::{format_note_lines, note_to_list_item, Context, NoteListItem};
use crate::error::CliError;

pub async fn run_list(
    context: &Context,
    category: Option<Category>,
    as_json: bool,
) -> Result<(), CliError> {
    let mut session = context.open_session(context.reader()).await?;
    session.set_category_filter(category);
    let notes = session.current_filtered_notes();

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_note_lines(&notes) {
            println!("{line}");
        }
    }

    Ok(())
}
