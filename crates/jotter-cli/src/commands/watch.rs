use jotter_core::Category;

use crate::commands::common::{format_note_lines, Context};
use crate::error::CliError;

pub async fn run_watch(context: &Context, category: Option<Category>) -> Result<(), CliError> {
    let mut session = context.open_session(context.reader()).await?;
    session.set_category_filter(category);
    let mut revisions = session.revisions();

    loop {
        println!("--- {} note(s)", session.current_filtered_notes().len());
        for line in format_note_lines(&session.current_filtered_notes()) {
            println!("{line}");
        }

        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    tracing::debug!("Live view stopped");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
