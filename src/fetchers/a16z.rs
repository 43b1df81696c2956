//! a16z crypto articles.

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, instrument};

use super::DetailFetcher;
use super::html::{CONTENT_TAGS, blocks_to_markdown, join_names, select_all_text, select_first, select_text};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

pub struct A16zFetcher;

#[async_trait]
impl DetailFetcher for A16zFetcher {
    fn name(&self) -> &'static str {
        "a16z"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    // Dates look like "8.24.23"; anything else is left blank.
    let release_date = select_text(&doc, ".caption-2")?.and_then(|raw| match dates::normalize_dotted_short_year(&raw) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(error = %e, "Unrecognised a16z date");
            None
        }
    });

    let content = match select_first(&doc, ".wysiwyg")? {
        Some(body) => Some(blocks_to_markdown(body, CONTENT_TAGS, "\n")?),
        None => None,
    };

    Ok(DetailRecord {
        title: select_text(&doc, ".highlight-display > h2:nth-child(1)")?,
        authors: join_names(select_all_text(&doc, ".sep-comma-and span")?),
        release_date,
        content,
        ..DetailRecord::EMPTY
    })
}
