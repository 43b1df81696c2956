//! arXiv papers via the Atom export API.
//!
//! The paper id is the last path segment of the link (`.pdf` stripped), so
//! `https://arxiv.org/abs/1904.05234` and `https://arxiv.org/pdf/1904.05234.pdf`
//! resolve to the same paper.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::DetailFetcher;
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::{strip_pdf_suffix, truncate_for_log};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: String,
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
}

pub struct ArxivFetcher {
    api_url: String,
}

impl ArxivFetcher {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
        }
    }
}

/// `1904.05234` from any abs/pdf link.
pub fn arxiv_id(url: &str) -> Option<&str> {
    let trimmed = strip_pdf_suffix(url.trim().trim_end_matches('/'));
    trimmed.rsplit('/').next().filter(|id| !id.is_empty())
}

#[async_trait]
impl DetailFetcher for ArxivFetcher {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let id = arxiv_id(url).ok_or_else(|| HarvestError::parse(format!("no arXiv id in {url}")))?;
        let body = http
            .get_text_with_query(&self.api_url, &[("id_list", id), ("max_results", "1")])
            .await?;
        debug!(%id, bytes = body.len(), "arXiv feed received");
        parse_feed(&body).inspect_err(|e| {
            debug!(%id, error = %e, body_preview = %truncate_for_log(&body, 300), "Unusable arXiv feed");
        })
    }
}

/// Parse an Atom response holding one entry.
pub fn parse_feed(xml: &str) -> Result<DetailRecord> {
    let feed: Feed = from_str(xml)?;
    let entry = feed
        .entries
        .into_iter()
        .next()
        .ok_or_else(|| HarvestError::parse("arXiv feed has no entry"))?;
    if entry.id.contains("/api/errors") {
        return Err(HarvestError::parse(format!("arXiv error entry: {}", collapse(&entry.title))));
    }

    let pdf_link = entry
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf"))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry.id.replace("/abs/", "/pdf/"));

    Ok(DetailRecord {
        title: Some(collapse(&entry.title)),
        authors: Some(
            entry
                .authors
                .iter()
                .map(|a| a.name.trim())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        pdf_link: Some(pdf_link),
        topics: Some(
            entry
                .categories
                .iter()
                .map(|c| c.term.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        release_date: Some(dates::from_iso_timestamp(&entry.published)?),
        ..DetailRecord::EMPTY
    })
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::testing;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=1904.05234</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1904.05234v1</id>
    <updated>2019-04-10T15:04:03Z</updated>
    <published>2019-04-10T15:04:03Z</published>
    <title>Flash Boys 2.0: Frontrunning, Transaction Reordering, and
  Consensus Instability in Decentralized Exchanges</title>
    <summary>Blockchains, and specifically smart contracts...</summary>
    <author><name>Philip Daian</name></author>
    <author><name>Steven Goldfeder</name></author>
    <link href="http://arxiv.org/abs/1904.05234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1904.05234v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.CR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.GT" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_arxiv_id() {
        assert_eq!(arxiv_id("https://arxiv.org/abs/1904.05234"), Some("1904.05234"));
        assert_eq!(arxiv_id("https://arxiv.org/pdf/1904.05234.pdf"), Some("1904.05234"));
        assert_eq!(arxiv_id("https://arxiv.org/abs/2301.07041/"), Some("2301.07041"));
    }

    #[test]
    fn test_parse_feed() {
        let record = parse_feed(FEED).unwrap();
        assert_eq!(
            record.title.as_deref(),
            Some("Flash Boys 2.0: Frontrunning, Transaction Reordering, and Consensus Instability in Decentralized Exchanges")
        );
        assert_eq!(record.authors.as_deref(), Some("Philip Daian, Steven Goldfeder"));
        assert_eq!(record.pdf_link.as_deref(), Some("http://arxiv.org/pdf/1904.05234v1"));
        assert_eq!(record.topics.as_deref(), Some("cs.CR, cs.GT"));
        assert_eq!(record.release_date.as_deref(), Some("2019-04-10"));
    }

    #[test]
    fn test_empty_feed_is_error() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>q</title></feed>"#;
        assert!(parse_feed(xml).is_err());
    }

    #[tokio::test]
    async fn test_scrape_queries_export_api() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/query"))
            .and(wiremock::matchers::query_param("id_list", "1904.05234"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ArxivFetcher::new(&format!("{}/api/query", server.uri()));
        let record = fetcher
            .fetch(&testing::client(), "https://arxiv.org/pdf/1904.05234.pdf")
            .await;
        assert_eq!(record.topics.as_deref(), Some("cs.CR, cs.GT"));
    }
}
