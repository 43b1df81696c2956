//! Public Notion pages (`<workspace>.notion.site`).
//!
//! Pages are fetched over plain HTTP; the content block has to be present in
//! the server render for this to yield anything.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::instrument;
use url::Url;

use super::DetailFetcher;
use super::html::{page_title, select_first, structured_text};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

static SLASHED_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}/\d{2}/\d{2}").expect("static regex"));

pub struct NotionFetcher;

/// Workspace name and root URL: `https://flashbots.notion.site/x` ->
/// (`flashbots`, `https://flashbots.notion.site`).
pub fn author_from_url(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let mut labels = host.split('.');
    let first = labels.next()?;
    let name = if first == "www" { labels.next()? } else { first };
    Some((name.to_string(), format!("{}://{host}", parsed.scheme())))
}

#[async_trait]
impl DetailFetcher for NotionFetcher {
    fn name(&self) -> &'static str {
        "notion"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(url, &body)
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let text: String = doc.root_element().text().collect();
    let release_date = SLASHED_DATE
        .find(&text)
        .map(|m| dates::normalize(m.as_str(), &["%Y/%m/%d"]))
        .transpose()?;
    let (authors, authors_urls) = author_from_url(url).unzip();

    Ok(DetailRecord {
        title: page_title(&doc)?,
        authors,
        authors_urls,
        release_date,
        content: select_first(&doc, "div.notion-page-content")?.map(structured_text),
        ..DetailRecord::EMPTY
    })
}
