//! Propeller Heads blog posts.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{CONTENT_TAGS, blocks_to_markdown, select_first, select_text};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

pub struct PropellerHeadsFetcher;

#[async_trait]
impl DetailFetcher for PropellerHeadsFetcher {
    fn name(&self) -> &'static str {
        "propellerheads"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let release_date = select_text(&doc, ".article-title_content > div:nth-child(1)")?
        .map(|raw| dates::normalize(&raw, &["%B %d, %Y"]))
        .transpose()?;
    let content = match select_first(&doc, ".article-content_rich-text")? {
        Some(body) => Some(blocks_to_markdown(body, CONTENT_TAGS, "\n\n")?),
        None => None,
    };

    Ok(DetailRecord {
        title: select_text(&doc, ".article-title_heading")?,
        authors: select_text(&doc, ".article-content_author-text > div:nth-child(2)")?,
        release_date,
        content,
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let html = r#"<html><body>
<h1 class="article-title_heading">Solver Routing</h1>
<div class="article-title_content"><div>August 7, 2023</div><div>8 min read</div></div>
<div class="article-content_author-text"><div>Written by</div><div>Tanay</div></div>
<div class="article-content_rich-text"><h2>Why</h2><p>Solvers need liquidity.</p></div>
</body></html>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Solver Routing"));
        assert_eq!(record.release_date.as_deref(), Some("2023-08-07"));
        assert_eq!(record.authors.as_deref(), Some("Tanay"));
        assert_eq!(record.content.as_deref(), Some("## Why\n\nSolvers need liquidity."));
    }
}
