//! Data models for harvested links and their enriched details.
//!
//! - [`LinkRecord`]: a raw `(url, referrer)` pair as gathered upstream
//! - [`DetailRecord`]: what a detail fetcher extracts from one page
//! - [`PaperRow`]: one row of the paper details CSV
//!
//! Column-name constants describe the CSV layouts the store reads and writes.

use serde::{Deserialize, Serialize};

/// Header of link buckets (`to_parse.csv`, `arxiv_papers.csv`, `websites.csv`, ...).
pub const LINK_COLUMNS: [&str; 2] = ["paper", "referrer"];

/// Header of article buckets (`articles.csv`, `articles_updated.csv`).
pub const ARTICLE_COLUMNS: [&str; 5] = ["article", "referrer", "title", "release_date", "authors"];

/// Header of the paper details file.
pub const PAPER_COLUMNS: [&str; 6] = [
    "title",
    "authors",
    "pdf_link",
    "topics",
    "release_date",
    "referrer",
];

/// A link as gathered upstream. Identity is the exact `url` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: String,
    /// Where the link was found (a tweet, a blog, a person).
    pub referrer: String,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>, referrer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: referrer.into(),
        }
    }
}

/// Metadata and content extracted from one paper or article page.
///
/// Every field is optional because sources expose different subsets. The
/// all-`None` value [`DetailRecord::EMPTY`] is the failure sentinel: a
/// fetcher returns it when the page could not be fetched or parsed. A record
/// with at least one field set is a successful, possibly sparse, result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub title: Option<String>,
    /// Comma-separated author names.
    pub authors: Option<String>,
    /// Canonical link to the paper or article.
    pub pdf_link: Option<String>,
    /// Comma-separated topics, or the source name for sites without topics.
    pub topics: Option<String>,
    /// `YYYY-MM-DD`.
    pub release_date: Option<String>,
    pub authors_urls: Option<String>,
    /// Body as Markdown.
    pub content: Option<String>,
    pub author_firm_name: Option<String>,
    pub author_firm_url: Option<String>,
}

impl DetailRecord {
    /// The shared "nothing could be fetched" value.
    pub const EMPTY: DetailRecord = DetailRecord {
        title: None,
        authors: None,
        pdf_link: None,
        topics: None,
        release_date: None,
        authors_urls: None,
        content: None,
        author_firm_name: None,
        author_firm_url: None,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Whether the record carries a non-blank article body.
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Build the paper details row for this record.
    ///
    /// Returns `None` when the record has no title, since the paper details
    /// file is keyed by title.
    pub fn to_paper_row(&self, referrer: &str) -> Option<PaperRow> {
        let title = self.title.as_deref()?.trim();
        if title.is_empty() {
            return None;
        }
        Some(PaperRow {
            title: title.to_string(),
            authors: self.authors.clone().unwrap_or_default(),
            pdf_link: self.pdf_link.clone().unwrap_or_default(),
            topics: self.topics.clone().unwrap_or_default(),
            release_date: self.release_date.clone().unwrap_or_default(),
            referrer: referrer.to_string(),
        })
    }
}

/// One row of `paper_details.csv`, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRow {
    pub title: String,
    pub authors: String,
    pub pdf_link: String,
    pub topics: String,
    pub release_date: String,
    pub referrer: String,
}

impl PaperRow {
    /// Field values in [`PAPER_COLUMNS`] order.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.authors.clone(),
            self.pdf_link.clone(),
            self.topics.clone(),
            self.release_date.clone(),
            self.referrer.clone(),
        ]
    }
}
