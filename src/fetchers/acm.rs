//! ACM Digital Library citation pages.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{join_names, require_text, selector, text_of};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::strip_pdf_suffix;

pub struct AcmFetcher;

#[async_trait]
impl DetailFetcher for AcmFetcher {
    fn name(&self) -> &'static str {
        "dl-acm"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(strip_pdf_suffix(url)).await?;
        parse_page(url, &body)
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let title = require_text(&doc, ".citation__title")?;

    // Author names live in the picture's alt text; fall back to the visible name.
    let pictures = selector("li.loa__item img.author-picture")?;
    let names = selector("li.loa__item .loa__author-name")?;
    let mut authors: Vec<String> = doc
        .select(&pictures)
        .filter_map(|img| img.value().attr("alt"))
        .map(str::to_string)
        .collect();
    if authors.iter().all(|a| a.trim().is_empty()) {
        authors = doc.select(&names).map(text_of).collect();
    }

    let date = require_text(&doc, ".CitationCoverDate")?;

    Ok(DetailRecord {
        title: Some(title),
        authors: join_names(authors),
        pdf_link: Some(url.to_string()),
        topics: Some("dl-acm".to_string()),
        release_date: Some(dates::normalize(&date, &["%d %B %Y"])?),
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let html = r#"<html><body>
<h1 class="citation__title">SoK: Decentralized Finance</h1>
<ul><li class="loa__item"><a><img class="author-picture" alt="Sam Werner"><span class="loa__author-name">Sam Werner</span></a></li>
<li class="loa__item"><a><img class="author-picture" alt="Daniel Perez"></a></li></ul>
<span class="CitationCoverDate">25 September 2022</span>
</body></html>"#;
        let record = parse_page("https://dl.acm.org/doi/10.1145/1", html).unwrap();
        assert_eq!(record.title.as_deref(), Some("SoK: Decentralized Finance"));
        assert_eq!(record.authors.as_deref(), Some("Sam Werner, Daniel Perez"));
        assert_eq!(record.release_date.as_deref(), Some("2022-09-25"));
    }

    #[test]
    fn test_missing_title_is_error() {
        assert!(parse_page("u", "<html><body></body></html>").is_err());
    }
}
