//! Entry point for the EPUB search pipeline.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml`.
//! - Wire the resolver and store client together and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epub_searcher::{
    AppConfig, RemoteStore, SearchRequest, SearchResults, SourceResolver, ingest, load_config,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

#[derive(Debug, Parser)]
#[command(name = "epub-searcher", about = "Index EPUB publications for full-text search")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "conf/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Create the store schema (run once against a fresh store)
    Setup,
    /// Ingest one or more EPUBs, local paths or URLs
    Load {
        #[arg(required = true)]
        sources: Vec<String>,
        /// Fail the run on the first bad document instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Search the index
    Search {
        /// Query words; omit to browse authors
        words: Option<String>,
        /// Restrict to an author (repeatable)
        #[arg(long = "author")]
        authors: Vec<String>,
    },
    /// List every indexed book with the author facet
    Books,
    /// Clear a store table
    Truncate {
        #[arg(default_value = "Books")]
        table: String,
    },
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let config: AppConfig = load_config(&cli.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(endpoint = %config.store_endpoint, level = %config.log_level, "Starting");

    match cli.command {
        CliCommand::Setup => {
            let store = RemoteStore::open(&config)?;
            store.setup_schema().context("Schema setup failed")?;
            println!("schema created");
        }
        CliCommand::Load { sources, strict } => {
            let resolver = SourceResolver::new(&config)?;
            let store = RemoteStore::open(&config)?;
            let report =
                ingest::run_batch(&resolver, &store, &sources).context("Batch load failed")?;
            println!("loaded {} document(s)", report.loaded);
            for failure in &report.failures {
                warn!(designator = %failure.designator, "Not ingested: {}", failure.error);
            }
            if strict && !report.failures.is_empty() {
                anyhow::bail!("{} document(s) failed to ingest", report.failures.len());
            }
        }
        CliCommand::Search { words, authors } => {
            let request = SearchRequest {
                words,
                authors: authors.into_iter().collect(),
            };
            let store = RemoteStore::open(&config)?;
            let results = store.search(&request).context("Search failed")?;
            print_results(&results, request.has_criteria());
        }
        CliCommand::Books => {
            let store = RemoteStore::open(&config)?;
            let results = store.books_listing().context("Listing failed")?;
            print_results(&results, true);
        }
        CliCommand::Truncate { table } => {
            let store = RemoteStore::open(&config)?;
            store.truncate(&table).context("Truncate failed")?;
            println!("truncated {table}");
        }
    }
    Ok(())
}

fn print_results(results: &SearchResults, show_rows: bool) {
    if show_rows {
        println!("{} hit(s)", results.hits);
        for record in &results.records {
            println!(
                "{} / {}",
                record.text("title").unwrap_or("(untitled)"),
                record.text("author").unwrap_or("(unknown)")
            );
            for snippet in record.snippets("snippet_html") {
                println!("    {snippet}");
            }
            if let Some(path) = record.text("file_path") {
                println!("    {path}");
            }
        }
    }
    if !results.drilldowns.is_empty() {
        println!("authors:");
        for bucket in &results.drilldowns {
            println!("    {} ({})", bucket.value, bucket.count);
        }
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter_layer))
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
