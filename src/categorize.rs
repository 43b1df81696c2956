//! Link categorization.
//!
//! Two independent classifications run over every raw link:
//!
//! 1. [`categorize_url`] decides between Twitter thread, article and website
//!    using the status-URL rule, the configured regex table and the domain
//!    allow-list.
//! 2. Substring tests route paper-like links to paper buckets (`papers`,
//!    `arxiv_papers`, `<site>_papers`) and YouTube links to `youtube_videos`.
//!
//! [`partition`] combines both into named buckets plus the unconsumed
//! remainder that goes back to the input file.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

use crate::config::HarvestConfig;
use crate::domains::DomainAllowList;
use crate::error::{HarvestError, Result};
use crate::models::LinkRecord;

pub const PAPERS_BUCKET: &str = "papers";
pub const YOUTUBE_BUCKET: &str = "youtube_videos";
pub const TWITTER_BUCKET: &str = "twitter_threads";
pub const ARTICLES_BUCKET: &str = "articles";
pub const WEBSITES_BUCKET: &str = "websites";

const YOUTUBE_PREFIXES: [&str; 2] = ["https://www.youtube.com/watch", "https://youtu.be/"];

/// Result of [`categorize_url`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    TwitterThread,
    Article,
    Website,
}

impl Category {
    /// Bucket the category persists to.
    pub fn bucket(self) -> &'static str {
        match self {
            Self::TwitterThread => TWITTER_BUCKET,
            Self::Article => ARTICLES_BUCKET,
            Self::Website => WEBSITES_BUCKET,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TwitterThread => "twitter_thread",
            Self::Article => "article",
            Self::Website => "website",
        };
        f.write_str(s)
    }
}

/// Compiled `url_patterns` from the configuration.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: Vec<(String, Regex)>,
}

impl PatternTable {
    /// Compile named patterns. An invalid regex is a configuration error.
    pub fn compile<'a>(patterns: impl IntoIterator<Item = (&'a String, &'a String)>) -> Result<Self> {
        let patterns = patterns
            .into_iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|re| (name.clone(), re))
                    .map_err(|e| HarvestError::Config(format!("url pattern {name:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Name of the first pattern matching at the start of `url`.
    pub fn first_match(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.find(url).is_some_and(|m| m.start() == 0))
            .map(|(name, _)| name.as_str())
    }
}

/// Whether `url` points at a single tweet.
pub fn is_twitter_status(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let twitter_host = ["twitter.com", "x.com"]
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")));
    twitter_host && url.path().contains("/status/")
}

/// Classify one URL. First match wins:
///
/// 1. Twitter status URL -> [`Category::TwitterThread`]
/// 2. any pattern in `patterns` -> [`Category::Article`]
/// 3. starts with a known domain (case-insensitive) -> [`Category::Article`]
/// 4. otherwise, including unparsable URLs -> [`Category::Website`]
pub fn categorize_url(url: &str, patterns: &PatternTable, known_domains: &DomainAllowList) -> Category {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return Category::Website;
    };
    if is_twitter_status(&parsed) {
        return Category::TwitterThread;
    }
    if let Some(name) = patterns.first_match(url) {
        debug!(%url, pattern = name, "Matched article pattern");
        return Category::Article;
    }
    if known_domains.matches(url) {
        return Category::Article;
    }
    Category::Website
}

/// Everything [`partition`] needs besides the allow-list.
#[derive(Debug, Clone)]
pub struct CategorizeRules {
    pub patterns: PatternTable,
    /// Hosts with a dedicated paper bucket (`arxiv`, `ssrn`, `iacr`).
    pub paper_hosts: Vec<String>,
    /// Research-site substrings, each with a `<site>_papers` bucket.
    pub research_websites: Vec<String>,
}

impl CategorizeRules {
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        Ok(Self {
            patterns: PatternTable::compile(&config.url_patterns)?,
            paper_hosts: lowercase_all(&config.paper_hosts),
            research_websites: lowercase_all(&config.research_websites),
        })
    }

    /// Substring bucket for a link, in precedence order: PDFs off known paper
    /// hosts, known paper hosts, research sites, YouTube.
    pub fn substring_bucket(&self, url: &str) -> Option<String> {
        let lower = url.to_lowercase();
        let on_paper_host = self.paper_hosts.iter().any(|h| lower.contains(h.as_str()));
        if lower.contains(".pdf") && !on_paper_host {
            return Some(PAPERS_BUCKET.to_string());
        }
        if let Some(host) = self.paper_hosts.iter().find(|h| lower.contains(h.as_str())) {
            return Some(format!("{host}_papers"));
        }
        if let Some(site) = self.research_websites.iter().find(|s| lower.contains(s.as_str())) {
            return Some(format!("{site}_papers"));
        }
        if YOUTUBE_PREFIXES.iter().any(|p| url.starts_with(p)) {
            return Some(YOUTUBE_BUCKET.to_string());
        }
        None
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Buckets produced from one batch of links.
#[derive(Debug, Default)]
pub struct Partition {
    /// Bucket name -> rows, in input order.
    pub buckets: BTreeMap<String, Vec<LinkRecord>>,
    /// Rows no bucket other than `websites` claimed; they stay in the input
    /// so a grown allow-list can pick them up on a later pass.
    pub remainder: Vec<LinkRecord>,
}

impl Partition {
    pub fn bucket(&self, name: &str) -> &[LinkRecord] {
        self.buckets.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Split `rows` into buckets.
///
/// A row can land in one substring bucket and, independently, in
/// `twitter_threads` or `articles`. Rows claimed by neither go to `websites`
/// and to the remainder. Duplicate URLs in the input keep their first row.
#[instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub fn partition(rows: &[LinkRecord], rules: &CategorizeRules, known_domains: &DomainAllowList) -> Partition {
    let mut out = Partition::default();
    let mut seen = HashSet::new();

    for row in rows {
        if !seen.insert(row.url.as_str()) {
            continue;
        }
        let substring = rules.substring_bucket(&row.url);
        let category = categorize_url(&row.url, &rules.patterns, known_domains);

        if let Some(bucket) = &substring {
            out.buckets.entry(bucket.clone()).or_default().push(row.clone());
        }
        match category {
            Category::TwitterThread | Category::Article => {
                out.buckets
                    .entry(category.bucket().to_string())
                    .or_default()
                    .push(row.clone());
            }
            Category::Website if substring.is_none() => {
                out.buckets
                    .entry(WEBSITES_BUCKET.to_string())
                    .or_default()
                    .push(row.clone());
                out.remainder.push(row.clone());
            }
            Category::Website => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CategorizeRules {
        CategorizeRules::from_config(&HarvestConfig::default()).unwrap()
    }

    fn no_domains() -> DomainAllowList {
        DomainAllowList::new()
    }

    #[test]
    fn test_twitter_status_wins_over_everything() {
        let mut domains = DomainAllowList::new();
        domains.insert("https://twitter.com");
        let patterns = PatternTable::compile(&BTreeMap::from([(
            "everything".to_string(),
            ".*".to_string(),
        )]))
        .unwrap();

        for url in [
            "https://twitter.com/bertcmiller/status/123",
            "https://mobile.twitter.com/someone/status/9",
            "https://x.com/someone/status/42",
        ] {
            assert_eq!(categorize_url(url, &patterns, &domains), Category::TwitterThread);
            assert_eq!(
                categorize_url(url, &PatternTable::default(), &no_domains()),
                Category::TwitterThread
            );
        }
    }

    #[test]
    fn test_patterns_then_domains_then_website() {
        let rules = rules();
        assert_eq!(
            categorize_url("https://vitalik.medium.com/some-post-1", &rules.patterns, &no_domains()),
            Category::Article
        );

        let mut domains = DomainAllowList::new();
        domains.insert("https://www.galaxy.com/insights/research");
        let patterns = PatternTable::default();
        assert_eq!(
            categorize_url("https://WWW.GALAXY.COM/insights/research/x/", &patterns, &domains),
            Category::Article
        );
        assert_eq!(
            categorize_url("https://example.org/a/b/c", &patterns, &domains),
            Category::Website
        );
    }

    #[test]
    fn test_malformed_urls_are_websites() {
        let rules = rules();
        for url in ["", "not a url", "twitter.com/status/1", "http://"] {
            assert_eq!(categorize_url(url, &rules.patterns, &no_domains()), Category::Website);
        }
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = PatternTable::compile(&BTreeMap::from([("bad".to_string(), "(".to_string())]))
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_pattern_must_match_at_start() {
        let patterns = PatternTable::compile(&BTreeMap::from([(
            "medium".to_string(),
            r"https://medium\.com/.+".to_string(),
        )]))
        .unwrap();
        assert!(patterns.first_match("https://medium.com/p/1").is_some());
        assert!(patterns.first_match("https://example.com/?u=https://medium.com/p/1").is_none());
    }

    #[test]
    fn test_substring_bucket_precedence() {
        let rules = rules();
        assert_eq!(
            rules.substring_bucket("https://example.com/whitepaper.PDF").as_deref(),
            Some("papers")
        );
        assert_eq!(
            rules.substring_bucket("https://arxiv.org/pdf/1904.05234.pdf").as_deref(),
            Some("arxiv_papers")
        );
        assert_eq!(
            rules.substring_bucket("https://papers.ssrn.com/sol3/papers.cfm?abstract_id=1").as_deref(),
            Some("ssrn_papers")
        );
        assert_eq!(
            rules.substring_bucket("https://eprint.iacr.org/2023/123").as_deref(),
            Some("iacr_papers")
        );
        assert_eq!(
            rules.substring_bucket("https://dl.acm.org/doi/10.1145/1").as_deref(),
            Some("dl.acm_papers")
        );
        assert_eq!(
            rules.substring_bucket("https://youtu.be/abc").as_deref(),
            Some("youtube_videos")
        );
        assert_eq!(rules.substring_bucket("https://flashbots.net"), None);
    }

    #[test]
    fn test_partition_twitter_example_goes_to_threads() {
        let rows = vec![LinkRecord::new("https://twitter.com/bertcmiller/status/123", "x")];
        let parts = partition(&rows, &rules(), &no_domains());
        assert_eq!(parts.bucket(TWITTER_BUCKET), rows.as_slice());
        assert!(parts.bucket(WEBSITES_BUCKET).is_empty());
        assert!(parts.remainder.is_empty());
    }

    #[test]
    fn test_partition_routes_every_kind() {
        let rows = vec![
            LinkRecord::new("https://arxiv.org/abs/1904.05234", "a"),
            LinkRecord::new("https://www.youtube.com/watch?v=1", "b"),
            LinkRecord::new("https://vitalik.medium.com/post-1", "c"),
            LinkRecord::new("https://flashbots.net", "d"),
            LinkRecord::new("https://flashbots.net", "duplicate"),
            LinkRecord::new("https://www.nature.com/articles/s41586", "e"),
        ];
        let parts = partition(&rows, &rules(), &no_domains());

        assert_eq!(parts.bucket("arxiv_papers").len(), 1);
        assert_eq!(parts.bucket(YOUTUBE_BUCKET).len(), 1);
        assert!(parts.bucket(ARTICLES_BUCKET).iter().any(|r| r.referrer == "c"));
        assert_eq!(parts.bucket("nature_papers").len(), 1);
        assert_eq!(parts.bucket(WEBSITES_BUCKET), [LinkRecord::new("https://flashbots.net", "d")]);
        assert_eq!(parts.remainder, vec![LinkRecord::new("https://flashbots.net", "d")]);
    }

    #[test]
    fn test_partition_row_can_be_paper_and_article() {
        let mut domains = DomainAllowList::new();
        domains.insert("https://research.example.com");
        let rows = vec![LinkRecord::new("https://research.example.com/report.pdf", "a")];
        let parts = partition(&rows, &rules(), &domains);
        assert_eq!(parts.bucket(PAPERS_BUCKET).len(), 1);
        assert_eq!(parts.bucket(ARTICLES_BUCKET).len(), 1);
        assert!(parts.remainder.is_empty());
    }
}
