//! Medium stories.

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use tracing::{instrument, warn};

use super::DetailFetcher;
use super::html::{CONTENT_TAGS, blocks_to_markdown, meta_content, page_title, select_first, selector, text_of};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;

/// Medium prints "Jan 5, 2023", or "Jan 5" for the current year.
const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y"];
const DATE_FORMATS_NO_YEAR: &[&str] = &["%b %d", "%B %d"];

#[derive(Debug, Deserialize)]
struct LinkedData {
    publisher: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
    url: Option<String>,
}

pub struct MediumFetcher;

#[async_trait]
impl DetailFetcher for MediumFetcher {
    fn name(&self) -> &'static str {
        "medium"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    // article > section > third div holds the story body
    let section = select_first(&doc, "article section")?
        .ok_or_else(|| HarvestError::parse("no article section"))?;
    let div = selector("div")?;
    let body = section
        .select(&div)
        .nth(2)
        .ok_or_else(|| HarvestError::parse("article section has no body div"))?;
    let content = blocks_to_markdown(body, CONTENT_TAGS, "\n")?;

    let release_date = match select_first(&doc, "[data-testid=storyPublishDate]")? {
        Some(el) => {
            let raw = text_of(el);
            Some(
                dates::normalize(&raw, DATE_FORMATS)
                    .or_else(|_| dates::normalize_without_year(&raw, DATE_FORMATS_NO_YEAR))?,
            )
        }
        None => None,
    };

    let (author_firm_name, author_firm_url) = publisher(&doc)?;

    Ok(DetailRecord {
        title: page_title(&doc)?,
        authors: meta_content(&doc, "name", "author")?,
        authors_urls: meta_content(&doc, "property", "article:author")?,
        release_date,
        content: Some(content),
        author_firm_name,
        author_firm_url,
        ..DetailRecord::EMPTY
    })
}

/// Publisher name and URL from the JSON-LD block.
fn publisher(doc: &Html) -> Result<(Option<String>, Option<String>)> {
    let Some(script) = select_first(doc, "script[type='application/ld+json']")? else {
        return Ok((None, None));
    };
    let json: String = script.text().collect();
    match serde_json::from_str::<LinkedData>(&json) {
        Ok(LinkedData {
            publisher: Some(publisher),
        }) => Ok((publisher.name, publisher.url)),
        Ok(_) => Ok((None, None)),
        Err(e) => {
            warn!(error = %e, "Unreadable JSON-LD on Medium page");
            Ok((None, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Understanding MEV | by Ada | Flashbots</title>
<meta name="author" content="Ada Lovelace">
<meta property="article:author" content="https://medium.com/@ada">
<script type="application/ld+json">{"@context":"http://schema.org","publisher":{"name":"Flashbots","url":"https://medium.com/flashbots"}}</script>
</head><body><article><section>
<div><div><h1>Understanding MEV</h1></div>
<div><p>Intro paragraph.</p><h2>Details</h2><ul><li>point</li></ul></div></div>
</section><span data-testid="storyPublishDate">Mar 3, 2021</span></article></body></html>"#;

    #[test]
    fn test_parse_page() {
        let record = parse_page(PAGE).unwrap();
        assert_eq!(record.title.as_deref(), Some("Understanding MEV | by Ada | Flashbots"));
        assert_eq!(record.authors.as_deref(), Some("Ada Lovelace"));
        assert_eq!(record.authors_urls.as_deref(), Some("https://medium.com/@ada"));
        assert_eq!(record.release_date.as_deref(), Some("2021-03-03"));
        assert_eq!(record.author_firm_name.as_deref(), Some("Flashbots"));
        assert_eq!(record.author_firm_url.as_deref(), Some("https://medium.com/flashbots"));
        let content = record.content.unwrap();
        assert!(content.starts_with("Intro paragraph."));
        assert!(content.contains("## Details"));
    }

    #[test]
    fn test_page_without_article_is_error() {
        assert!(parse_page("<html><body>paywall</body></html>").is_err());
    }
}
