//! IACR ePrint archive pages.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{require_text, select_first, select_text};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::strip_pdf_suffix;

static BIBTEX_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"author\s*=\s*\{([^}]*)\}").expect("static regex"));

const HISTORY_SELECTOR: &str = "#metadata > dl:nth-child(2) > dd:nth-child(12)";
const HISTORY_FALLBACK_SELECTOR: &str = "#metadata > dl:nth-child(2) > dd:nth-child(10)";

pub struct IacrFetcher;

#[async_trait]
impl DetailFetcher for IacrFetcher {
    fn name(&self) -> &'static str {
        "iacr"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let page = strip_pdf_suffix(url);
        let body = http.get_text(page).await?;
        parse_page(url, &body)
    }
}

/// Authors come from the bibtex block (`author = {A and B}`); the date is the
/// first entry of the version history ("2023-01-12: approved").
pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    let title = select_text(&doc, "head > title:nth-child(4)")?
        .map_or_else(|| require_text(&doc, "title"), Ok)?;

    let bibtex: String = select_first(&doc, "#bibtex")?
        .ok_or_else(|| HarvestError::parse("IACR page has no bibtex"))?
        .text()
        .collect();
    let authors = BIBTEX_AUTHOR.captures(&bibtex).map(|caps| {
        caps[1]
            .split(" and ")
            .map(|a| a.split_whitespace().collect::<Vec<_>>().join(" ").replace(['[', ']', '\''], ""))
            .collect::<Vec<_>>()
            .join(", ")
    });

    let mut history = require_text(&doc, HISTORY_SELECTOR)?;
    if history.contains("See all versions") {
        history = require_text(&doc, HISTORY_FALLBACK_SELECTOR)?;
    }
    let date = history.split(':').next().unwrap_or_default().trim();
    if date.is_empty() {
        return Err(HarvestError::parse("IACR history has no date"));
    }

    Ok(DetailRecord {
        title: Some(title),
        authors,
        pdf_link: Some(url.to_string()),
        topics: Some("IACR".to_string()),
        release_date: Some(dates::normalize(date, &["%Y-%m-%d"])?),
        ..DetailRecord::EMPTY
    })
}
