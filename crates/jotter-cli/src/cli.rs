use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use jotter_core::Category;

#[derive(Parser)]
#[command(name = "jotter")]
#[command(about = "Shared categorized notes with full edit history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Acting identity (defaults to JOTTER_USER or the config file)
    #[arg(long, global = true, value_name = "NAME")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(short, long)]
        title: String,
        /// Note category
        #[arg(short, long, value_enum)]
        category: CategoryArg,
        /// Note content (read from stdin when omitted and piped)
        content: Vec<String>,
    },
    /// List current notes
    List {
        /// Only show notes in this category
        #[arg(short, long, value_enum)]
        category: Option<CategoryArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note, archiving its current state
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New content
        #[arg(long)]
        content: Option<String>,
        /// New category
        #[arg(short, long, value_enum)]
        category: Option<CategoryArg>,
    },
    /// Delete a note you own
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Show archived versions of a note, oldest first
    History {
        /// Note ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a note to one of its archived versions
    Revert {
        /// Note ID or unique ID prefix
        id: String,
        /// Version number as shown by `jotter history`
        index: usize,
    },
    /// Print the note list again after every change until interrupted
    Watch {
        /// Only show notes in this category
        #[arg(short, long, value_enum)]
        category: Option<CategoryArg>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CategoryArg {
    Work,
    Personal,
    Other,
}

impl From<CategoryArg> for Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Work => Self::Work,
            CategoryArg::Personal => Self::Personal,
            CategoryArg::Other => Self::Other,
        }
    }
}
