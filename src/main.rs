mod cli;

use crate::cli::{BookmarkCommand, Cli, Command};
use clap::Parser;
use folio_cache::ExpiringCache;
use folio_catalog::Collection;
use folio_config::Config;
use folio_fetch::{Fetcher, HttpTransport, RetryPolicy};
use folio_reader::{Level, LoadOutcome, ReaderSettings, Retriever, Session, View};
use folio_storage::backend::LocalStore;
use miette::{IntoDiagnostic, miette};
use std::error::Error as StdError;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Flatten an error tree into a report carrying the top-level message.
fn report<E: StdError + Send + Sync + 'static>(err: exn::Exn<E>) -> miette::Report {
    tracing::debug!(error = ?err, "Command failed");
    miette!("{}", &*err)
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn build_session(config: &Config) -> miette::Result<Session> {
    let state_dir = config.state_dir().map_err(report)?;
    let store = Arc::new(LocalStore::new("local", &state_dir).map_err(report)?);
    let transport = Arc::new(HttpTransport::new(&config.fetch.user_agent).map_err(report)?);
    let policy = RetryPolicy {
        attempts: config.fetch.attempts,
        initial_backoff: config.fetch.initial_backoff(),
        timeout: config.fetch.timeout(),
        not_found_sentinel: config.fetch.not_found_sentinel().map(str::to_string),
    };
    let cache = ExpiringCache::new(store).with_listing_ttl(config.cache.listing_ttl());
    let retriever = Retriever::new(Fetcher::with_policy(transport, policy), cache, config.remote.clone());
    tracing::debug!(state_dir = %state_dir.display(), "Session ready");
    Ok(Session::new(Arc::new(retriever), ReaderSettings::from(&config.reader)))
}

fn print_view(view: &View) {
    println!("{}  [{}]", view.document.display_name, view.progress);
    println!();
    println!("{}", view.body.trim_end());
    println!();
    let mut hints = Vec::new();
    if view.navigation.previous {
        hints.push("prev");
    }
    if view.navigation.next {
        hints.push("next");
    }
    if view.scroll_offset > 0 {
        println!("(scroll offset {})", view.scroll_offset);
    }
    if !hints.is_empty() {
        println!("({})", hints.join(" | "));
    }
}

fn print_outcome(outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Applied(view) => print_view(view),
        LoadOutcome::AtBoundary => println!("No further document in this direction."),
        LoadOutcome::Superseded => tracing::debug!("Load superseded"),
    }
}

async fn run(session: &Session, command: Command) -> miette::Result<()> {
    match command {
        Command::List(args) => {
            let collection = args.collection();
            session.load_listing(collection).await.map_err(report)?;
            for (index, document) in session.listing(collection).iter().enumerate() {
                println!("{:>4}  {}", index + 1, document.display_name);
            }
        },
        Command::Read(args) => {
            let collection = args.collection.collection();
            session.load_listing(collection).await.map_err(report)?;
            let index = usize::try_from(args.number - 1).into_diagnostic()?;
            print_outcome(&session.load_document(collection, index).await.map_err(report)?);
        },
        Command::Next | Command::Prev => {
            if session.start().await.map_err(report)?.is_none() {
                return Err(miette!("no document is open; use `folio read` first"));
            }
            let outcome = match command {
                Command::Next => session.navigate_next().await,
                _ => session.navigate_previous().await,
            };
            print_outcome(&outcome.map_err(report)?);
        },
        Command::Resume => match session.start().await.map_err(report)? {
            Some(outcome) => print_outcome(&outcome),
            None => println!("Nothing to resume."),
        },
        Command::Scroll(args) => {
            session.start().await.map_err(report)?;
            if session.current().is_none() {
                return Err(miette!("no document is open; use `folio read` first"));
            }
            if session.update_scroll(args.offset, args.height).await.map_err(report)? {
                println!("Reading ahead.");
            }
        },
        Command::Bookmark(BookmarkCommand::Save) => {
            session.start().await.map_err(report)?;
            let saved = session.save_bookmark().await.map_err(report)?;
            println!("Saved bookmark at {} (offset {}).", saved.identifier, saved.scroll_offset);
        },
        Command::Bookmark(BookmarkCommand::Load) => {
            session.load_listings().await;
            print_outcome(&session.load_bookmark().await.map_err(report)?);
        },
        Command::Search(args) => {
            session.load_listings().await;
            let hits = session.search(&args.query);
            if hits.is_empty() {
                println!("No matches.");
            }
            for hit in hits {
                let flag = if hit.collection == Collection::Profile { " --profiles" } else { "" };
                println!("[{}] {}  (folio read {}{flag})", hit.collection, hit.document.display_name, hit.index + 1);
            }
        },
        Command::Clear => {
            let removed = session.clear_all_cache().await.map_err(report)?;
            println!("Removed {removed} cached entries.");
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    let session = build_session(&config)?;

    let result = run(&session, cli.command).await;
    if let Some(fetched) = session.settle_preload().await {
        tracing::info!(fetched, "Read-ahead finished");
    }
    for notice in session.notices().settle().await {
        match notice.level {
            Level::Error => eprintln!("error: {notice}"),
            Level::Info => eprintln!("{notice}"),
        }
    }
    result
}
