//! Jotter CLI - shared categorized notes from the command line
//!
//! Every edit keeps the previous version; `jotter history` lists them and
//! `jotter revert` restores one.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use jotter_core::config::Config;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::Context;
use crate::commands::{
    add::run_add, delete::run_delete, edit::run_edit, history::run_history, list::run_list,
    revert::run_revert, watch::run_watch,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config);

    let context = Context::new(cli.db_path, cli.user, &config);

    match cli.command {
        Commands::Add {
            title,
            category,
            content,
        } => run_add(&context, &title, category.into(), &content).await?,
        Commands::List { category, json } => {
            run_list(&context, category.map(Into::into), json).await?;
        }
        Commands::Edit {
            id,
            title,
            content,
            category,
        } => {
            run_edit(
                &context,
                &id,
                title,
                content,
                category.map(Into::into),
            )
            .await?;
        }
        Commands::Delete { id } => run_delete(&context, &id).await?,
        Commands::History { id, json } => run_history(&context, &id, json).await?,
        Commands::Revert { id, index } => run_revert(&context, &id, index).await?,
        Commands::Watch { category } => run_watch(&context, category.map(Into::into)).await?,
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
