//! ResearchGate publication pages, fetched as plain HTML.
//!
//! ResearchGate often answers bots with a challenge page; that page lacks the
//! title heading and surfaces as a parse error.

use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::instrument;

use super::DetailFetcher;
use super::html::{join_names, require_text, select_all_text};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;
use crate::utils::strip_pdf_suffix;

static AFFILIATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)university|institute|school").expect("static regex"));

pub struct ResearchGateFetcher;

#[async_trait]
impl DetailFetcher for ResearchGateFetcher {
    fn name(&self) -> &'static str {
        "researchgate"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(strip_pdf_suffix(url)).await?;
        parse_page(url, &body)
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);
    let title = require_text(&doc, "h1.nova-legacy-e-text")?;

    let authors = select_all_text(&doc, ".nova-legacy-l-flex .research-detail-author-list__item a")?
        .into_iter()
        .unique()
        .filter(|name| !AFFILIATION.is_match(name))
        .collect::<Vec<_>>();

    let date = require_text(
        &doc,
        "div.nova-legacy-e-text--spacing-xxs:nth-child(1) > ul:nth-child(1) > li:nth-child(1)",
    )?;

    Ok(DetailRecord {
        title: Some(title),
        authors: join_names(authors),
        pdf_link: Some(url.to_string()),
        topics: Some("ResearchGate".to_string()),
        release_date: Some(dates::normalize_month_year(&date)?),
        ..DetailRecord::EMPTY
    })
}
