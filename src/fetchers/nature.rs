//! Nature articles. Comment pieces and News & Views use different layouts.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, instrument};

use super::DetailFetcher;
use super::html::{require_text, select_first, select_text};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::strip_pdf_suffix;

static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z, ]").expect("static regex"));

pub struct NatureFetcher;

#[async_trait]
impl DetailFetcher for NatureFetcher {
    fn name(&self) -> &'static str {
        "nature"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(strip_pdf_suffix(url)).await?;
        parse_page(url, &body)
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let kind = match select_text(&doc, ".c-article-identifiers__type")? {
        Some(kind) => kind,
        None => require_text(&doc, "li.c-article-identifiers__item:nth-child(1)")?,
    };
    debug!(%kind, "Nature article type");

    let (title, authors_raw, date) = match kind.as_str() {
        "COMMENT" | "Comment" => (
            require_text(&doc, ".c-article-magazine-title")?,
            author_list_text(&doc)?,
            require_text(&doc, "li.c-article-identifiers__item:nth-child(2) > time:nth-child(1)")?,
        ),
        "News & Views" => (
            require_text(&doc, ".c-article-title")?,
            author_list_text(&doc)?
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
            require_text(
                &doc,
                "li.c-article-identifiers__item:nth-child(2) > a:nth-child(1) > time:nth-child(1)",
            )?,
        ),
        other => return Err(HarvestError::parse(format!("unsupported Nature article type {other:?}"))),
    };

    Ok(DetailRecord {
        title: Some(title),
        authors: Some(clean_authors(&authors_raw)),
        pdf_link: Some(url.to_string()),
        topics: Some("nature".to_string()),
        release_date: Some(dates::normalize(&date, &["%d %B %Y"])?),
        ..DetailRecord::EMPTY
    })
}

/// Raw author list text, line breaks preserved.
fn author_list_text(doc: &Html) -> Result<String> {
    let list = select_first(doc, ".c-article-author-list")?
        .ok_or_else(|| HarvestError::parse("no .c-article-author-list"))?;
    Ok(list.text().collect::<String>().trim().to_string())
}

/// "A. Smith, B. Jones & C. Wu" -> "A Smith, B Jones, C Wu".
fn clean_authors(raw: &str) -> String {
    let names: Vec<String> = raw
        .replace('&', ",")
        .split(',')
        .map(|name| NON_NAME_CHARS.replace_all(name, "").split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .collect();
    names.join(", ")
}
