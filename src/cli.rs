use clap::{Args, Parser, Subcommand};
use folio_catalog::Collection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Read a remote chapter collection with local caching", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace). Overrides RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the documents of a collection
    List(CollectionArgs),
    /// Open the document at a listing position (1-based)
    Read(ReadArgs),
    /// Open the document after the current one
    Next,
    /// Open the document before the current one
    Prev,
    /// Reopen the document from the previous session
    Resume,
    /// Record the scroll offset within the current document
    Scroll(ScrollArgs),
    /// Save or restore the bookmark
    #[command(subcommand)]
    Bookmark(BookmarkCommand),
    /// Find documents by title
    Search(SearchArgs),
    /// Drop every cached listing and document and forget the current position
    Clear,
}

#[derive(Args, Debug)]
pub struct CollectionArgs {
    /// Use the character profiles instead of the chapters
    #[arg(short, long)]
    pub profiles: bool,
}
impl CollectionArgs {
    pub fn collection(&self) -> Collection {
        if self.profiles { Collection::Profile } else { Collection::Primary }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Position in the listing, starting at 1
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub number: u64,
    #[command(flatten)]
    pub collection: CollectionArgs,
}

#[derive(Args, Debug)]
pub struct ScrollArgs {
    /// Scroll offset from the top of the document
    pub offset: u64,
    /// Total height of the document
    pub height: u64,
}

#[derive(Subcommand, Debug)]
pub enum BookmarkCommand {
    /// Save the current position, scroll offset included
    Save,
    /// Reopen the bookmarked position
    Load,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,
}
