//! Paradigm research posts.

use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{CONTENT_TAGS_WITH_DIV, blocks_to_markdown, join_names, select_first, select_first_in, selector, text_of};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;

const BASE: &str = "https://www.paradigm.xyz";

pub struct ParadigmFetcher;

#[async_trait]
impl DetailFetcher for ParadigmFetcher {
    fn name(&self) -> &'static str {
        "paradigm"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(&body)
    }
}

/// Details line reads "Mar 03, 2023 | Alice, Bob"; author links to team
/// pages are relative.
pub fn parse_page(html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let title = select_first(&doc, ".Post_post__J7vh4")?
        .map(|post| select_first_in(post, "h1"))
        .transpose()?
        .flatten()
        .map(text_of);

    let details = select_first(&doc, ".Post_post__details__W3e0e")?
        .ok_or_else(|| HarvestError::parse("no post details"))?;
    let details_text = text_of(details);
    let date = details_text.split('|').next().unwrap_or_default().trim();
    let release_date = dates::normalize(date, &["%b %d, %Y", "%B %d, %Y"])?;

    let mut authors = Vec::new();
    let mut author_urls = Vec::new();
    for link in details.select(&selector("span a")?) {
        authors.push(text_of(link));
        if let Some(href) = link.value().attr("href") {
            if href.starts_with('/') {
                author_urls.push(format!("{BASE}{href}"));
            } else {
                author_urls.push(href.to_string());
            }
        }
    }

    // The CSS-module hash changed case once; accept both spellings.
    let content = match select_first(&doc, ".Post_post__content__dMuW4")?
        .or(select_first(&doc, ".Post_post__content__dmuW4")?)
    {
        Some(body) => blocks_to_markdown(body, CONTENT_TAGS_WITH_DIV, "\n")?,
        None => String::new(),
    };

    Ok(DetailRecord {
        title,
        authors: join_names(authors),
        authors_urls: join_names(author_urls),
        release_date: Some(release_date),
        content: Some(content),
        ..DetailRecord::EMPTY
    })
}
