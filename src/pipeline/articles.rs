//! `articles`: article links -> Markdown documents plus filled-in metadata.
//!
//! New rows of the `articles` bucket are first merged into
//! `articles_updated.csv`, the working copy that carries title, release date
//! and authors. Each selected row is fetched, its body written to
//! `<data_dir>/articles/<slug>.md`, and the metadata written back to the
//! working copy in one keyed update.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use super::report_dry_run;
use crate::categorize::ARTICLES_BUCKET;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::fetchers::FetcherRegistry;
use crate::http::HttpClient;
use crate::models::{ARTICLE_COLUMNS, DetailRecord, LinkRecord};
use crate::outputs::markdown::{ArticleDocument, article_path, write_article};
use crate::runner;
use crate::store::{RowUpdate, Table, UpsertStats, update_rows, upsert};

/// Working copy of the articles bucket.
pub const UPDATED_BUCKET: &str = "articles_updated";

const KEY: &str = ARTICLE_COLUMNS[0];

#[derive(Debug, Clone, Default)]
pub struct ArticleOptions {
    pub fetch: bool,
    pub workers: usize,
    /// Refetch articles whose document already exists.
    pub overwrite: bool,
    /// Only URLs containing one of these substrings; empty selects all.
    pub filters: Vec<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ArticlesSummary {
    /// Rows the merge added to the working copy.
    pub merged: usize,
    pub selected: usize,
    pub skipped: usize,
    /// Rows a dry run would fetch.
    pub pending: usize,
    pub empty: usize,
    pub written: usize,
    pub updated: usize,
}

/// One row of the working copy.
#[derive(Debug, Clone)]
struct ArticleRow {
    url: String,
    referrer: String,
    /// Title already recorded, if any.
    title: String,
}

impl ArticleRow {
    /// Title used for the document name: the recorded one, else the URL.
    fn display_title(&self) -> &str {
        if self.title.trim().is_empty() { &self.url } else { &self.title }
    }
}

/// Copy rows of the `articles` bucket missing from the working copy.
pub fn merge_new_articles(config: &HarvestConfig) -> Result<UpsertStats> {
    let source = Table::read(&config.bucket_path(ARTICLES_BUCKET))?;
    let incoming = Table::new(&ARTICLE_COLUMNS).concat(&source);
    upsert(&config.bucket_path(UPDATED_BUCKET), &incoming, KEY)
}

fn select_rows(table: &Table, opts: &ArticleOptions) -> Vec<ArticleRow> {
    let value = |idx: usize, column: &str| table.get(idx, column).unwrap_or_default().trim().to_string();
    let rows = (0..table.len())
        .map(|idx| ArticleRow {
            url: value(idx, KEY),
            referrer: value(idx, "referrer"),
            title: value(idx, "title"),
        })
        .filter(|row| !row.url.is_empty())
        .filter(|row| opts.filters.is_empty() || opts.filters.iter().any(|f| row.url.contains(f.as_str())));
    match opts.limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    }
}

/// Metadata to write back for one fetched article. The recorded title is
/// kept; a fetched title only fills a blank one.
fn row_update(row: &ArticleRow, record: &DetailRecord) -> RowUpdate {
    let mut update = RowUpdate::new();
    if row.title.is_empty() {
        if let Some(title) = &record.title {
            update.insert("title".into(), title.clone());
        }
    }
    if let Some(date) = &record.release_date {
        update.insert("release_date".into(), date.clone());
    }
    if let Some(authors) = &record.authors {
        update.insert("authors".into(), authors.clone());
    }
    update
}

#[instrument(level = "info", skip_all, fields(fetch = opts.fetch, workers = opts.workers, overwrite = opts.overwrite))]
pub async fn harvest_articles(
    config: &HarvestConfig,
    http: &HttpClient,
    registry: &FetcherRegistry,
    opts: &ArticleOptions,
) -> Result<ArticlesSummary> {
    let merged = merge_new_articles(config)?;
    let updated_path = config.bucket_path(UPDATED_BUCKET);
    let rows = select_rows(&Table::read(&updated_path)?, opts);
    let mut summary = ArticlesSummary {
        merged: merged.added(),
        selected: rows.len(),
        ..ArticlesSummary::default()
    };

    let articles_dir = config.articles_dir();
    let dir = articles_dir.as_path();
    let skip = |row: &ArticleRow| {
        let exists = article_path(dir, row.display_title()).exists();
        if exists && !opts.overwrite {
            debug!(url = %row.url, "Document exists; skipping");
        }
        exists && !opts.overwrite
    };

    if !opts.fetch {
        let pending: Vec<LinkRecord> = rows
            .iter()
            .filter(|row| !skip(*row))
            .map(|row| LinkRecord::new(row.url.as_str(), row.referrer.as_str()))
            .collect();
        summary.pending = pending.len();
        summary.skipped = summary.selected - summary.pending;
        report_dry_run("articles", &pending);
        return Ok(summary);
    }

    let report = runner::run(rows, opts.workers, skip, move |row: ArticleRow| async move {
        let record = registry.fetch(http, &row.url).await;
        (!record.is_empty()).then_some((row, record))
    })
    .await;
    summary.skipped = report.skipped;
    summary.empty = report.empty;

    let mut updates: HashMap<String, RowUpdate> = HashMap::new();
    for (row, record) in &report.results {
        if record.has_content() {
            let title = if row.title.is_empty() {
                record.title.as_deref().unwrap_or(row.url.as_str())
            } else {
                row.title.as_str()
            };
            write_article(
                dir,
                &ArticleDocument {
                    url: &row.url,
                    referrer: &row.referrer,
                    title,
                    record,
                },
            )
            .await?;
            summary.written += 1;
        } else {
            debug!(url = %row.url, "Fetched article has no body; metadata only");
        }
        updates.insert(row.url.clone(), row_update(row, record));
    }
    summary.updated = update_rows(&updated_path, &updates, KEY)?;

    info!(
        merged = summary.merged,
        selected = summary.selected,
        skipped = summary.skipped,
        empty = summary.empty,
        written = summary.written,
        updated = summary.updated,
        "Article harvest complete"
    );
    Ok(summary)
}
