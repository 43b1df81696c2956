//! Command-line interface definitions for paper_harvest.
//!
//! Global options pick the configuration file and data directory; each
//! subcommand runs one pipeline. Fetching commands are dry runs unless
//! `--fetch` (or `HARVEST_FETCH=true`) is given.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::articles::ArticleOptions;
use crate::pipeline::papers::PaperOptions;

/// Command-line arguments for paper_harvest.
///
/// # Examples
///
/// ```sh
/// # Sort data/links/to_parse.csv into buckets
/// paper_harvest categorize
///
/// # See which arXiv papers would be fetched, then fetch them
/// paper_harvest papers --bucket arxiv_papers
/// paper_harvest papers --bucket arxiv_papers --fetch --download-pdfs
///
/// # Fetch ten HackMD articles with a custom config
/// paper_harvest --config harvest.yaml articles --fetch --filter hackmd --limit 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory; overrides `data_dir` from the config file
    #[arg(short, long, env = "HARVEST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sort raw links into bucket CSVs and grow the domain allow-list
    Categorize {
        /// Link CSV to read (defaults to <data_dir>/links/to_parse.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Fetch paper details into paper_details.csv
    Papers(PapersArgs),
    /// Fetch article bodies into Markdown documents
    Articles(ArticlesArgs),
}

/// Options shared by the fetching commands.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Make network calls; without this the command only reports what it would fetch
    #[arg(long, env = "HARVEST_FETCH")]
    pub fetch: bool,

    /// Concurrent fetches (defaults to `workers` from the config file)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Refetch rows whose output already exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PapersArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Also download each new paper's PDF into <data_dir>/papers
    #[arg(long)]
    pub download_pdfs: bool,

    /// Paper bucket to read; repeatable. Defaults to every paper bucket
    #[arg(long = "bucket")]
    pub buckets: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ArticlesArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Only article URLs containing this substring; repeatable
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Process at most this many articles
    #[arg(long)]
    pub limit: Option<usize>,
}

impl PapersArgs {
    pub fn options(&self, default_workers: usize) -> PaperOptions {
        PaperOptions {
            fetch: self.fetch.fetch,
            workers: self.fetch.workers.unwrap_or(default_workers),
            overwrite: self.fetch.overwrite,
            download_pdfs: self.download_pdfs,
            buckets: self.buckets.clone(),
        }
    }
}

impl ArticlesArgs {
    pub fn options(&self, default_workers: usize) -> ArticleOptions {
        ArticleOptions {
            fetch: self.fetch.fetch,
            workers: self.fetch.workers.unwrap_or(default_workers),
            overwrite: self.fetch.overwrite,
            filters: self.filters.clone(),
            limit: self.limit,
        }
    }
}
