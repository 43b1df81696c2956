//! `papers`: paper buckets -> `paper_details.csv`, optionally with PDFs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::report_dry_run;
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::fetchers::FetcherRegistry;
use crate::http::HttpClient;
use crate::models::{LINK_COLUMNS, LinkRecord, PAPER_COLUMNS, PaperRow};
use crate::runner;
use crate::store::{Table, read_column, read_links, upsert};
use crate::utils::{slugify_title, strip_pdf_suffix};

static ARXIV_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"v\d+$").expect("static regex"));

#[derive(Debug, Clone, Default)]
pub struct PaperOptions {
    pub fetch: bool,
    pub workers: usize,
    /// Refetch links already in the details file and replace existing PDFs.
    pub overwrite: bool,
    pub download_pdfs: bool,
    /// Buckets to read; empty means every paper bucket.
    pub buckets: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PapersSummary {
    /// Distinct links across the selected buckets.
    pub candidates: usize,
    pub skipped: usize,
    /// Links a dry run would fetch.
    pub pending: usize,
    /// Links that yielded nothing usable.
    pub empty: usize,
    pub fetched: usize,
    pub added: usize,
    pub downloaded: usize,
}

/// `<host>_papers` and `<site>_papers` for every configured paper host and
/// research site.
pub fn default_paper_buckets(config: &HarvestConfig) -> Vec<String> {
    config
        .paper_hosts
        .iter()
        .chain(&config.research_websites)
        .map(|site| format!("{}_papers", site.to_lowercase()))
        .unique()
        .collect()
}

/// Comparable form of a paper link, so a bucket URL can be matched against
/// the `pdf_link` a fetcher recorded for it.
///
/// Scheme, `www.`, a trailing slash and a `.pdf` suffix are ignored; arXiv
/// `/pdf/<id>v2` and `/abs/<id>` compare equal.
pub fn link_key(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = strip_pdf_suffix(rest.trim_end_matches('/'));
    if let Some(id) = rest.strip_prefix("arxiv.org/pdf/").or_else(|| rest.strip_prefix("arxiv.org/abs/")) {
        return format!("arxiv.org/abs/{}", ARXIV_VERSION.replace(id, ""));
    }
    rest.to_string()
}

/// Where the PDF for `title` is saved.
pub fn pdf_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.pdf", slugify_title(title)))
}

/// Fetch details for every paper link not yet in `paper_details.csv` and
/// merge them in, keyed by title.
#[instrument(level = "info", skip_all, fields(fetch = opts.fetch, workers = opts.workers, overwrite = opts.overwrite))]
pub async fn harvest_papers(
    config: &HarvestConfig,
    http: &HttpClient,
    registry: &FetcherRegistry,
    opts: &PaperOptions,
) -> Result<PapersSummary> {
    let details_path = config.paper_details_path();
    let known_links: HashSet<String> = read_column(&details_path, "pdf_link")?
        .iter()
        .map(|link| link_key(link))
        .collect();
    let known_titles: HashSet<String> = read_column(&details_path, "title")?.into_iter().collect();

    let buckets = if opts.buckets.is_empty() {
        default_paper_buckets(config)
    } else {
        opts.buckets.clone()
    };
    let mut rows = Vec::new();
    for bucket in &buckets {
        let links = read_links(&config.bucket_path(bucket), LINK_COLUMNS[0])?;
        debug!(%bucket, count = links.len(), "Read paper bucket");
        rows.extend(links);
    }
    let rows: Vec<LinkRecord> = rows.into_iter().unique_by(|row| row.url.clone()).collect();

    let mut summary = PapersSummary {
        candidates: rows.len(),
        ..PapersSummary::default()
    };
    let skip = |row: &LinkRecord| {
        if registry.resolve(&row.url).is_none() {
            debug!(url = %row.url, "No fetcher for paper link");
            return true;
        }
        !opts.overwrite && known_links.contains(&link_key(&row.url))
    };

    if !opts.fetch {
        let pending: Vec<LinkRecord> = rows.into_iter().filter(|row| !skip(row)).collect();
        summary.pending = pending.len();
        summary.skipped = summary.candidates - summary.pending;
        report_dry_run("papers", &pending);
        return Ok(summary);
    }

    let report = runner::run(rows, opts.workers, skip, move |row: LinkRecord| async move {
        let record = registry.fetch(http, &row.url).await;
        if record.is_empty() {
            return None;
        }
        let paper = record.to_paper_row(&row.referrer);
        if paper.is_none() {
            warn!(url = %row.url, "Fetched paper has no title; not recorded");
        }
        paper
    })
    .await;
    summary.skipped = report.skipped;
    summary.empty = report.empty;
    summary.fetched = report.results.len();

    if !report.results.is_empty() {
        let mut table = Table::new(&PAPER_COLUMNS);
        for paper in &report.results {
            table.push_row(paper.values());
        }
        summary.added = upsert(&details_path, &table, "title")?.added();
    }

    if opts.download_pdfs {
        let to_download: Vec<PaperRow> = report
            .results
            .into_iter()
            .filter(|paper| opts.overwrite || !known_titles.contains(&paper.title))
            .collect();
        summary.downloaded = download_pdfs(config, http, to_download, opts).await;
    }

    info!(
        candidates = summary.candidates,
        skipped = summary.skipped,
        empty = summary.empty,
        fetched = summary.fetched,
        added = summary.added,
        downloaded = summary.downloaded,
        "Paper harvest complete"
    );
    Ok(summary)
}

async fn download_pdfs(config: &HarvestConfig, http: &HttpClient, papers: Vec<PaperRow>, opts: &PaperOptions) -> usize {
    let dir = config.papers_dir();
    let dir = dir.as_path();
    let skip = |paper: &PaperRow| paper.pdf_link.is_empty() || (!opts.overwrite && pdf_path(dir, &paper.title).exists());
    let report = runner::run(papers, opts.workers, skip, move |paper: PaperRow| async move {
        match download_pdf(http, &paper, dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(title = %paper.title, pdf_link = %paper.pdf_link, error = %e, "PDF download failed");
                None
            }
        }
    })
    .await;
    report.results.len()
}

/// Download one paper's PDF. A body that is not a PDF is an error.
#[instrument(level = "debug", skip_all, fields(pdf_link = %paper.pdf_link))]
async fn download_pdf(http: &HttpClient, paper: &PaperRow, dir: &Path) -> Result<PathBuf> {
    let fetched = http.get(&paper.pdf_link).await?;
    if !fetched.body.starts_with(b"%PDF") {
        return Err(HarvestError::parse(format!("{} did not return a PDF", fetched.final_url)));
    }
    fs::create_dir_all(dir).await.map_err(|e| HarvestError::io(dir, e))?;
    let path = pdf_path(dir, &paper.title);
    fs::write(&path, &fetched.body).await.map_err(|e| HarvestError::io(&path, e))?;
    info!(path = %path.display(), bytes = fetched.body.len(), "Saved paper PDF");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers;
    use crate::pipeline::testing;

    fn config_in(dir: &Path) -> HarvestConfig {
        HarvestConfig {
            data_dir: dir.to_path_buf(),
            ..HarvestConfig::default()
        }
    }

    fn write_bucket(config: &HarvestConfig, bucket: &str, urls: &[&str]) {
        let links: Vec<LinkRecord> = urls.iter().map(|u| LinkRecord::new(*u, "ref")).collect();
        Table::from_links("paper", &links).write(&config.bucket_path(bucket)).unwrap();
    }

    fn opts(fetch: bool) -> PaperOptions {
        PaperOptions {
            fetch,
            workers: 2,
            buckets: vec!["example_papers".into()],
            ..PaperOptions::default()
        }
    }

    #[test]
    fn test_link_key() {
        assert_eq!(link_key("http://arxiv.org/pdf/1904.05234v1"), link_key("https://arxiv.org/abs/1904.05234"));
        assert_eq!(link_key("https://www.Nature.com/articles/x/"), "nature.com/articles/x");
        assert_eq!(link_key("https://eprint.iacr.org/2023/123.pdf"), "eprint.iacr.org/2023/123");
    }

    #[test]
    fn test_default_paper_buckets() {
        let buckets = default_paper_buckets(&HarvestConfig::default());
        assert_eq!(&buckets[..3], ["arxiv_papers", "ssrn_papers", "iacr_papers"]);
        assert!(buckets.contains(&"dl.acm_papers".to_string()));
        assert_eq!(buckets.iter().filter(|b| *b == "arxiv_papers").count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        write_bucket(
            &config,
            "example_papers",
            &["https://example.org/p/1", "https://example.org/p/2", "https://nofetcher.net/x"],
        );
        let summary = harvest_papers(&config, &fetchers::testing::client(), &testing::registry("example.org"), &opts(false))
            .await
            .unwrap();
        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.skipped, 1);
        assert!(!config.paper_details_path().exists());
    }

    #[tokio::test]
    async fn test_fetch_merges_and_skips_known_links() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        write_bucket(
            &config,
            "example_papers",
            &[
                "https://example.org/p/1",
                "https://example.org/p/2",
                "https://example.org/p/broken",
                "https://nofetcher.net/x",
            ],
        );
        let http = fetchers::testing::client();
        let registry = testing::registry("example.org");

        let first = harvest_papers(&config, &http, &registry, &opts(true)).await.unwrap();
        assert_eq!(first.fetched, 2);
        assert_eq!(first.empty, 1);
        assert_eq!(first.skipped, 1);
        assert_eq!(first.added, 2);
        let mut titles = read_column(&config.paper_details_path(), "title").unwrap();
        titles.sort();
        assert_eq!(titles, ["Title of 1", "Title of 2"]);

        let second = harvest_papers(&config, &http, &registry, &opts(true)).await.unwrap();
        assert_eq!(second.skipped, 3);
        assert_eq!(second.added, 0);
        assert_eq!(read_column(&config.paper_details_path(), "title").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_download_pdfs_checks_magic_bytes() {
        let server = wiremock::MockServer::start().await;
        for (path, body) in [("/files/good", "%PDF-1.4 fake"), ("/files/bad", "<html>login</html>")] {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(path))
                .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        let good = format!("{}/files/good", server.uri());
        let bad = format!("{}/files/bad", server.uri());
        write_bucket(&config, "example_papers", &[&good, &bad]);

        let summary = harvest_papers(
            &config,
            &fetchers::testing::client(),
            &testing::registry("127.0.0.1"),
            &PaperOptions {
                download_pdfs: true,
                ..opts(true)
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.added, 2);
        assert_eq!(summary.downloaded, 1);
        let saved = pdf_path(&config.papers_dir(), "Title of good");
        assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.4 fake");
        assert!(!pdf_path(&config.papers_dir(), "Title of bad").exists());
    }
}
