mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{DeleteArgs, EditAttrArgs, RenameArgs, TreeArgs};
use markup_common::MemoryDocument;
use markup_view::MarkupView;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// markup-inspect - browse and edit a markup document the way the
/// inspector's markup view does
#[derive(Parser, Debug)]
#[command(name = "markup-inspect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding markup.config.json (defaults to the current one)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Children shown per node before "show more"
    #[arg(long)]
    page_size: Option<usize>,

    /// JSON document to load
    document: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tree
    Tree(TreeArgs),

    /// Edit attributes of an element
    EditAttr(EditAttrArgs),

    /// Change the tag name of an element
    Rename(RenameArgs),

    /// Remove a node
    Delete(DeleteArgs),
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref(), cli.page_size)?;

    let json = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("Cannot read {}", cli.document.display()))?;
    let doc = Arc::new(
        MemoryDocument::from_json(&json)
            .with_context(|| format!("Invalid document {}", cli.document.display()))?,
    );
    info!(
        document = %cli.document.display(),
        page_size = config.page_size,
        "Loaded document"
    );
    let mut view = MarkupView::new(doc.clone(), config).await?;

    match cli.command {
        Command::Tree(args) => commands::tree(&mut view, &doc, args).await,
        Command::EditAttr(args) => commands::edit_attr(&mut view, &doc, args).await,
        Command::Rename(args) => commands::rename(&mut view, &doc, args).await,
        Command::Delete(args) => commands::delete(&mut view, &doc, args).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("markup=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
