//! # Paper Harvest
//!
//! A link harvester for research papers and long-form articles. Raw links
//! collected from tweets and reading lists are sorted into CSV buckets by
//! source, then per-site fetchers fill in titles, authors, release dates and
//! bodies.
//!
//! ## Features
//!
//! - Categorizes links with configurable URL rules and a self-growing allow-list
//!   of research-site prefixes
//! - Deduplicating CSV upserts, so every pass is safe to repeat
//! - Fetchers for arXiv, SSRN, IACR ePrint, ACM, Nature, ResearchGate, Medium,
//!   Mirror, HackMD, Notion, Discourse forums and a set of research blogs
//! - Article bodies written as Markdown with YAML front matter
//! - Optional PDF downloads for fetched papers
//!
//! ## Usage
//!
//! ```sh
//! paper_harvest categorize
//! paper_harvest papers --fetch --download-pdfs
//! paper_harvest articles --fetch --filter mirror.xyz
//! ```
//!
//! ## Architecture
//!
//! 1. **Categorize**: `links/to_parse.csv` is split into `links/<bucket>.csv`
//! 2. **Papers**: paper buckets are fetched concurrently into `paper_details.csv`
//! 3. **Articles**: the article bucket is fetched into `articles/<slug>.md`
//!    and its metadata written back to `links/articles_updated.csv`

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod categorize;
mod cli;
mod config;
mod dates;
mod domains;
mod error;
mod fetchers;
mod http;
mod models;
mod outputs;
mod pipeline;
mod runner;
mod store;
mod utils;

use cli::{Cli, Command};
use config::load_config;
use fetchers::FetcherRegistry;
use http::HttpClient;
use pipeline::{articles, links, papers};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_harvest starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.data_dir, ?args.command, "Parsed CLI arguments");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    info!(data_dir = %config.data_dir.display(), workers = config.workers, "Loaded configuration");

    match args.command {
        Command::Categorize { input } => {
            let input = input.unwrap_or_else(|| config.to_parse_path());
            let summary = links::categorize_links(&config, &input)?;
            info!(
                input_rows = summary.input_rows,
                buckets = summary.buckets.len(),
                remainder = summary.remainder,
                "Links categorized"
            );
        }
        Command::Papers(papers_args) => {
            let opts = papers_args.options(config.workers);
            if opts.fetch && opts.download_pdfs {
                let papers_dir = config.papers_dir();
                if let Err(e) = ensure_writable_dir(&papers_dir).await {
                    error!(
                        path = %papers_dir.display(),
                        error = %e,
                        "Papers directory is not writable (fix perms or choose a different data dir)"
                    );
                    return Err(e);
                }
            }
            let http = HttpClient::new(&config.http)?;
            let registry = FetcherRegistry::with_defaults(&config);
            let summary = papers::harvest_papers(&config, &http, &registry, &opts).await?;
            info!(
                candidates = summary.candidates,
                fetched = summary.fetched,
                added = summary.added,
                downloaded = summary.downloaded,
                "Papers harvested"
            );
        }
        Command::Articles(articles_args) => {
            let opts = articles_args.options(config.workers);
            if opts.fetch {
                let articles_dir = config.articles_dir();
                if let Err(e) = ensure_writable_dir(&articles_dir).await {
                    error!(
                        path = %articles_dir.display(),
                        error = %e,
                        "Articles directory is not writable (fix perms or choose a different data dir)"
                    );
                    return Err(e);
                }
            }
            let http = HttpClient::new(&config.http)?;
            let registry = FetcherRegistry::with_defaults(&config);
            let summary = articles::harvest_articles(&config, &http, &registry, &opts).await?;
            info!(
                selected = summary.selected,
                written = summary.written,
                updated = summary.updated,
                "Articles harvested"
            );
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "paper_harvest finished"
    );
    Ok(())
}
