//! dba.xyz research posts.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{CONTENT_TAGS, blocks_to_markdown, select_first, select_text, text_of};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

const POST: &str = ".page-section > div:nth-child(1) > div:nth-child(1) > div:nth-child(1)";

pub struct DbaFetcher;

#[async_trait]
impl DetailFetcher for DbaFetcher {
    fn name(&self) -> &'static str {
        "dba"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    // Posts only print "March 3"
    let release_date = select_text(&doc, ".post-meta-data > span:nth-child(1)")?
        .map(|raw| dates::normalize_without_year(&raw, &["%B %d"]))
        .transpose()?;

    let author = select_first(&doc, ".post-meta-data > a:nth-child(2)")?;
    let content = match select_first(&doc, POST)? {
        Some(post) => Some(blocks_to_markdown(post, CONTENT_TAGS, "\n\n")?),
        None => None,
    };

    Ok(DetailRecord {
        title: select_text(&doc, &format!("{POST} > h1:nth-child(2)"))?,
        authors: author.map(text_of).filter(|a| !a.is_empty()),
        authors_urls: author.and_then(|a| a.value().attr("href")).map(str::to_string),
        release_date,
        content,
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Local};

    use super::*;

    #[test]
    fn test_parse_page() {
        let html = r#"<html><body><section class="page-section"><div><div><div>
<span class="eyebrow">Research</span><h1>Proposer Commitments</h1>
<div class="post-meta-data"><span>March 3</span><a href="https://dba.xyz/team/jon">Jon Charbonneau</a></div>
<p>Commitments let proposers sell future blockspace.</p>
</div></div></div></section></body></html>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Proposer Commitments"));
        assert_eq!(record.authors.as_deref(), Some("Jon Charbonneau"));
        assert_eq!(record.authors_urls.as_deref(), Some("https://dba.xyz/team/jon"));
        assert_eq!(
            record.release_date,
            Some(format!("{}-03-03", Local::now().year()))
        );
        let content = record.content.unwrap();
        assert!(content.starts_with("# Proposer Commitments"));
        assert!(content.ends_with("Commitments let proposers sell future blockspace."));
    }
}
