//! frontier.tech essays (a Notion site rendered server-side).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{html_to_markdown, sanitize_mojibake, select_text, selector, text_of};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

static CALLOUT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2} \w+ \d{4}").expect("static regex"));

pub struct FrontierFetcher;

#[async_trait]
impl DetailFetcher for FrontierFetcher {
    fn name(&self) -> &'static str {
        "frontier"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

/// The first callout names the author; the callout holding a "5 March 2023"
/// style date gives the release date.
pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let callouts: Vec<String> = doc.select(&selector("div.notion-callout__content")?).map(text_of).collect();

    let release_date = callouts
        .iter()
        .find_map(|c| CALLOUT_DATE.find(c))
        .map(|m| dates::normalize(m.as_str(), &["%d %B %Y", "%d %b %Y"]))
        .transpose()?;

    let mut blocks = Vec::new();
    for block in doc.select(&selector(".notion-text, .notion-heading, .notion-bulleted-list")?) {
        let md = html_to_markdown(&block.html())?;
        if !md.is_empty() {
            blocks.push(md);
        }
    }

    Ok(DetailRecord {
        title: select_text(&doc, "h1.notion-header__title")?,
        authors: callouts.first().filter(|c| !c.is_empty()).cloned(),
        release_date,
        content: Some(sanitize_mojibake(&blocks.join("\n\n"))),
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let html = r#"<html><body>
<h1 class="notion-header__title"> The Orderflow Auction Design Space </h1>
<div class="notion-callout"><div class="notion-callout__content">Alice Smith</div></div>
<div class="notion-callout"><div class="notion-callout__content">Published 5 March 2023</div></div>
<h2 class="notion-heading">Intro</h2>
<p class="notion-text">OFAs route flow.</p>
<ul class="notion-bulleted-list"><li>searchers</li></ul>
</body></html>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.title.as_deref(), Some("The Orderflow Auction Design Space"));
        assert_eq!(record.authors.as_deref(), Some("Alice Smith"));
        assert_eq!(record.release_date.as_deref(), Some("2023-03-05"));
        let content = record.content.unwrap();
        assert!(content.starts_with("## Intro"));
        assert!(content.contains("OFAs route flow."));
        assert!(content.contains("searchers"));
    }
}
