//! Discourse forum topics (ethresear.ch, Flashbots collective, Lido and Anoma
//! research forums).
//!
//! The crawler view Discourse serves to non-JS clients carries the first post
//! in `div.post[itemprop='articleBody']`.

use async_trait::async_trait;
use scraper::Html;
use tracing::{info, instrument};

use super::DetailFetcher;
use super::html::{CONTENT_TAGS_WITH_DIV, blocks_to_markdown, meta_content, page_title, select_first};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;

const POST_BODY: &str = "div.post[itemprop='articleBody']";

pub struct DiscourseFetcher;

#[async_trait]
impl DetailFetcher for DiscourseFetcher {
    fn name(&self) -> &'static str {
        "discourse"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        let record = parse_page(&body)?;
        info!(bytes = record.content.as_deref().map_or(0, str::len), "Fetched forum post");
        Ok(record)
    }
}

pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let post = select_first(&doc, POST_BODY)?
        .ok_or_else(|| HarvestError::parse(format!("no post body at {POST_BODY}")))?;
    let content = blocks_to_markdown(post, CONTENT_TAGS_WITH_DIV, "\n\n")?;

    let release_date = meta_content(&doc, "property", "article:published_time")?
        .map(|ts| dates::from_iso_timestamp(&ts))
        .transpose()?;
    let author_url = select_first(&doc, ".creator a")?
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    let title = meta_content(&doc, "property", "og:title")?.or(page_title(&doc)?);

    Ok(DetailRecord {
        title,
        release_date,
        authors: author_url.as_deref().and_then(username_from_profile),
        authors_urls: author_url,
        content: Some(content),
        ..DetailRecord::EMPTY
    })
}

/// `https://ethresear.ch/u/alice` -> `alice`.
fn username_from_profile(href: &str) -> Option<String> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
