use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use jotter_core::config::Config;
use jotter_core::repo::NoteRepository;
use jotter_core::store::SqliteStore;
use jotter_core::{ActorId, Category, HistoryEntry, ManualClock, Note, NoteDraft, NoteId};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{
    format_history_lines, format_relative_time, normalize_note_identifier, resolve_note, truncate,
    Context,
};
use crate::commands::delete::run_delete;
use crate::commands::edit::{apply_edits, run_edit};
use crate::commands::revert::run_revert;
use crate::error::CliError;

fn note(id: &str, title: &str) -> Note {
    Note {
        id: NoteId::from(id.to_string()),
        title: title.to_string(),
        content: String::new(),
        category: Category::Work,
        owner_id: ActorId::from("alice"),
        updated_at: 0,
    }
}

fn context(db_path: &Path, user: Option<&str>) -> Context {
    Context::new(
        Some(db_path.to_path_buf()),
        user.map(str::to_string),
        &Config::default(),
    )
}

fn repository(db_path: &Path) -> NoteRepository {
    let store = SqliteStore::open(db_path).unwrap();
    NoteRepository::new(Arc::new(store), Arc::new(ManualClock::new(0)))
}

#[test]
fn normalize_note_identifier_rejects_empty() {
    assert!(matches!(
        normalize_note_identifier(" \n "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(
        normalize_note_identifier("  abc123  ").unwrap(),
        "abc123".to_string()
    );
}

#[test]
fn resolve_note_supports_exact_and_prefix_id() {
    let notes = vec![
        note("11111111-1111-7111-8111-111111111111", "A"),
        note("11111111-1111-7111-8111-222222222222", "B"),
        note("33333333-1111-7111-8111-111111111111", "C"),
    ];

    assert_eq!(
        resolve_note("11111111-1111-7111-8111-222222222222", &notes)
            .unwrap()
            .title,
        "B"
    );
    assert_eq!(resolve_note("3333", &notes).unwrap().title, "C");
    assert!(matches!(
        resolve_note("11111111", &notes),
        Err(CliError::AmbiguousNoteId(_))
    ));
    assert!(matches!(
        resolve_note("9999", &notes),
        Err(CliError::NoteNotFound(_))
    ));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn truncate_adds_ellipsis() {
    assert_eq!(
        truncate("This is a very long sentence that should be shortened", 20),
        "This is a very lo..."
    );
    assert_eq!(truncate("  short\ttitle ", 20), "short title");
}

#[test]
fn history_lines_are_numbered_from_one() {
    let entry = |title: &str, saved_at| HistoryEntry {
        id: format!("h-{title}"),
        note_id: NoteId::from("n1".to_string()),
        title: title.to_string(),
        content: String::new(),
        category: Category::Personal,
        owner_id: ActorId::from("alice"),
        updated_at: 0,
        saved_at,
    };
    let lines = format_history_lines(&[entry("T1", 0), entry("T2", 1_000)]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("  1  1970-01-01 00:00:00 UTC  personal"));
    assert!(lines[0].ends_with("T1"));
    assert!(lines[1].starts_with("  2  1970-01-01 00:00:01 UTC"));
}

#[test]
fn apply_edits_keeps_omitted_fields() {
    let base = NoteDraft::new("Title", "Body", Category::Work);
    assert_eq!(
        apply_edits(base.clone(), None, None, Some(Category::Other)),
        NoteDraft::new("Title", "Body", Category::Other)
    );
    assert_eq!(
        apply_edits(base, Some(" New ".into()), Some(String::new()), None),
        NoteDraft::new("New", "", Category::Work)
    );
}

#[test]
fn context_without_user_cannot_write() {
    let ctx = context(Path::new("unused.db"), None);
    assert!(matches!(ctx.actor(), Err(CliError::MissingUser)));
    assert!(ctx.reader().is_empty());

    let ctx = context(Path::new("unused.db"), Some("  "));
    assert!(matches!(ctx.actor(), Err(CliError::MissingUser)));
}

#[test]
fn cli_exposes_only_note_commands() {
    let parsed = Cli::try_parse_from(["jotter", "--user", "alice", "watch", "-c", "work"]).unwrap();
    assert!(matches!(parsed.command, Commands::Watch { category: Some(_) }));
    assert!(Cli::try_parse_from(["jotter", "completions", "bash"]).is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn add_edit_revert_delete_through_commands() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jotter.db");
    let alice = context(&db_path, Some("alice"));

    run_add(&alice, "Groceries", Category::Personal, &["milk".to_string()])
        .await
        .unwrap();
    let id = repository(&db_path).list().await.unwrap()[0].id.clone();

    run_edit(&alice, id.as_str(), Some("Shopping".into()), None, None)
        .await
        .unwrap();
    let repo = repository(&db_path);
    assert_eq!(repo.require(&id).await.unwrap().title, "Shopping");
    assert_eq!(repo.history().len(&id).await.unwrap(), 1);

    run_edit(&alice, id.as_str(), None, None, None).await.unwrap();
    assert_eq!(repository(&db_path).history().len(&id).await.unwrap(), 1);

    assert!(matches!(
        run_revert(&alice, id.as_str(), 2).await,
        Err(CliError::NoSuchVersion { available: 1, .. })
    ));
    run_revert(&alice, &id.as_str()[..8], 1).await.unwrap();
    let repo = repository(&db_path);
    let current = repo.require(&id).await.unwrap();
    assert_eq!(current.title, "Groceries");
    assert_eq!(current.content, "milk");
    assert_eq!(repo.history().len(&id).await.unwrap(), 1);

    let bob = context(&db_path, Some("bob"));
    assert!(matches!(
        run_delete(&bob, id.as_str()).await,
        Err(CliError::Core(jotter_core::Error::Permission { .. }))
    ));
    assert!(repository(&db_path).get(&id).await.unwrap().is_some());

    run_delete(&alice, id.as_str()).await.unwrap();
    assert!(repository(&db_path).get(&id).await.unwrap().is_none());
}
