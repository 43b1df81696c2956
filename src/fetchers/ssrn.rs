//! SSRN abstract pages.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::require_text;
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::strip_pdf_suffix;

const NOT_FOUND_MARKER: &str = "The abstract you requested was not found";

pub struct SsrnFetcher;

#[async_trait]
impl DetailFetcher for SsrnFetcher {
    fn name(&self) -> &'static str {
        "ssrn"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let page = strip_pdf_suffix(url);
        let body = http.get_text(page).await?;
        parse_page(page, &body)
    }
}

/// Title from the `h1`; authors from the `<title>` line ("<title> by A, B ::
/// SSRN"); date from "Last revised: " or else "Posted: ".
pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let text: String = doc.root_element().text().collect();
    if text.contains(NOT_FOUND_MARKER) {
        return Err(HarvestError::parse("SSRN abstract not found"));
    }

    let title = require_text(&doc, "h1")?;
    let head_title = require_text(&doc, "title")?;
    let authors = head_title
        .replace(&title, "")
        .replace(" :: SSRN", "")
        .trim()
        .trim_start_matches("by ")
        .trim()
        .to_string();

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let date = lines
        .iter()
        .find_map(|l| l.split_once("Last revised: ").map(|(_, d)| d))
        .or_else(|| lines.iter().find_map(|l| l.split_once("Posted: ").map(|(_, d)| d)))
        .ok_or_else(|| HarvestError::parse("SSRN page has no posted date"))?;

    Ok(DetailRecord {
        title: Some(title),
        authors: (!authors.is_empty()).then_some(authors),
        pdf_link: Some(url.to_string()),
        topics: Some("SSRN".to_string()),
        release_date: Some(dates::normalize(date, &["%d %b %Y"])?),
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::testing;

    const PAGE: &str = r#"<html><head><title>Flashbots: Frontrunning the MEV Crisis by Ada Lovelace, Grace Hopper :: SSRN</title></head>
<body>
<div class="box-container"><h1>Flashbots: Frontrunning the MEV Crisis</h1>
<p class="note-list">
<span>Posted: 12 Jan 2021</span>
<span>Last revised: 3 Mar 2022</span>
</p></div></body></html>"#;

    #[test]
    fn test_parse_page() {
        let record = parse_page("https://papers.ssrn.com/sol3/papers.cfm?abstract_id=1", PAGE).unwrap();
        assert_eq!(record.title.as_deref(), Some("Flashbots: Frontrunning the MEV Crisis"));
        assert_eq!(record.authors.as_deref(), Some("Ada Lovelace, Grace Hopper"));
        assert_eq!(record.release_date.as_deref(), Some("2022-03-03"));
        assert_eq!(record.topics.as_deref(), Some("SSRN"));
    }

    #[test]
    fn test_posted_date_fallback() {
        let page = PAGE.replace("<span>Last revised: 3 Mar 2022</span>", "");
        let record = parse_page("u", &page).unwrap();
        assert_eq!(record.release_date.as_deref(), Some("2021-01-12"));
    }

    #[tokio::test]
    async fn test_missing_abstract_is_empty() {
        let server = wiremock::MockServer::start().await;
        let url = testing::serve_html(
            &server,
            "/sol3/papers.cfm",
            "<html><body><p>The abstract you requested was not found</p></body></html>",
        )
        .await;
        let record = SsrnFetcher.fetch(&testing::client(), &url).await;
        assert!(record.is_empty());
    }
}
