//! Markdown documents for fetched articles.
//!
//! Each article becomes `<articles_dir>/<slug>.md`: a YAML front matter block
//! with the metadata, the title as a heading, then the body the fetcher
//! converted to Markdown.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{HarvestError, Result};
use crate::models::DetailRecord;
use crate::utils::slugify_title;

const MAX_SLUG_CHARS: usize = 120;

/// One article ready to render.
#[derive(Debug, Clone, Copy)]
pub struct ArticleDocument<'a> {
    pub url: &'a str,
    pub referrer: &'a str,
    pub title: &'a str,
    pub record: &'a DetailRecord,
}

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    referrer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors_urls: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_firm_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_firm_url: Option<&'a str>,
}

/// `<slug>.md` for a title; `untitled.md` when nothing survives slugging.
pub fn article_file_name(title: &str) -> String {
    let slug: String = slugify_title(title).chars().take(MAX_SLUG_CHARS).collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "untitled.md".to_string()
    } else {
        format!("{slug}.md")
    }
}

/// Where the document for `title` lives under `dir`.
pub fn article_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(article_file_name(title))
}

/// Render front matter, heading and body.
pub fn article_to_markdown(doc: &ArticleDocument<'_>) -> Result<String> {
    let record = doc.record;
    let front = serde_yaml::to_string(&FrontMatter {
        title: doc.title,
        url: doc.url,
        referrer: doc.referrer,
        authors: record.authors.as_deref(),
        authors_urls: record.authors_urls.as_deref(),
        release_date: record.release_date.as_deref(),
        author_firm_name: record.author_firm_name.as_deref(),
        author_firm_url: record.author_firm_url.as_deref(),
    })?;

    let mut md = String::with_capacity(front.len() + record.content.as_deref().map_or(0, str::len) + 64);
    md.push_str("---\n");
    md.push_str(&front);
    md.push_str("---\n\n");
    md.push_str(&format!("# {}\n\n", doc.title.trim()));
    if let Some(content) = record.content.as_deref() {
        md.push_str(content.trim());
        md.push('\n');
    }
    Ok(md)
}

/// Write the document into `dir`, creating it if needed. Returns the path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), url = %doc.url))]
pub async fn write_article(dir: &Path, doc: &ArticleDocument<'_>) -> Result<PathBuf> {
    let md = article_to_markdown(doc)?;
    fs::create_dir_all(dir).await.map_err(|e| HarvestError::io(dir, e))?;
    let path = article_path(dir, doc.title);
    fs::write(&path, md).await.map_err(|e| HarvestError::io(&path, e))?;
    info!(path = %path.display(), "Wrote article");
    Ok(path)
}
