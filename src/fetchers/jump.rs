//! Jump Crypto research posts.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{CONTENT_TAGS, blocks_to_markdown, join_names, select_first, select_text};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

pub struct JumpFetcher;

#[async_trait]
impl DetailFetcher for JumpFetcher {
    fn name(&self) -> &'static str {
        "jump"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    // "Apr 20 2022_Research"
    let release_date = select_text(&doc, ".css-k1xgly")?
        .map(|raw| dates::normalize(raw.split('_').next().unwrap_or_default(), &["%b %d %Y"]))
        .transpose()?;

    let content = match select_first(&doc, "#postStyle")? {
        Some(post) => Some(blocks_to_markdown(post, CONTENT_TAGS, "\n")?),
        None => None,
    };

    Ok(DetailRecord {
        title: select_text(&doc, "h1.MuiTypography-root")?,
        authors: join_names(select_text(&doc, "h6.MuiTypography-root:nth-child(2)")?),
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
<h1 class="MuiTypography-root">Bridges</h1>
<div><h6 class="MuiTypography-root">By</h6><h6 class="MuiTypography-root">Jane Doe</h6></div>
<span class="css-k1xgly">Apr 20 2022_Research</span>
<div id="postStyle"><p>Bridges move value.</p><ol><li>lock</li><li>mint</li></ol></div>
</body></html>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Bridges"));
        assert_eq!(record.authors.as_deref(), Some("Jane Doe"));
        assert_eq!(record.release_date.as_deref(), Some("2022-04-20"));
        let content = record.content.unwrap();
        assert!(content.starts_with("Bridges move value."));
        assert!(content.contains("mint"));
    }

    #[test]
    fn test_bad_date_is_error() {
        let html = r#"<span class="css-k1xgly">sometime_Research</span>"#;
        assert!(parse_page(html).is_err());
    }
}
