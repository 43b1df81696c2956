//! Mirror entries (`<author>.mirror.xyz/...` and `mirror.xyz/<name>.eth/...`).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::instrument;
use url::Url;

use super::DetailFetcher;
use super::html::{CONTENT_TAGS_WITH_DIV, blocks_to_markdown, page_title, select_first, select_text, selector, text_of};
use crate::dates;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

static ORDINAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}(?:st|nd|rd|th), \d{4}\b").expect("static regex"));

pub struct MirrorFetcher;

/// Author derived from a Mirror URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorAuthor {
    pub name: Option<String>,
    pub url: Option<String>,
    /// A subdomain is a personal publication rather than a single entry.
    pub is_website: bool,
}

/// `alice.mirror.xyz/...` -> alice; `mirror.xyz/bob.eth/...` -> bob.eth.
pub fn author_from_url(url: &str) -> MirrorAuthor {
    let none = MirrorAuthor {
        name: None,
        url: None,
        is_website: false,
    };
    let Ok(parsed) = Url::parse(url) else {
        return none;
    };
    let Some(host) = parsed.host_str() else {
        return none;
    };
    let labels: Vec<&str> = host.split('.').collect();
    let first_segment = parsed.path_segments().and_then(|mut s| s.next()).unwrap_or_default();

    let (name, is_website) = if labels[0] != "mirror" && labels.len() > 2 {
        (labels[0].to_string(), true)
    } else if first_segment.ends_with(".eth") {
        (first_segment.to_string(), false)
    } else {
        return none;
    };
    MirrorAuthor {
        url: Some(format!("https://{host}/{name}")),
        name: Some(name),
        is_website,
    }
}

#[async_trait]
impl DetailFetcher for MirrorFetcher {
    fn name(&self) -> &'static str {
        "mirror"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let body = http.get_text(url).await?;
        parse_page(url, &body)
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    let release_date = doc
        .select(&selector("span")?)
        .map(text_of)
        .find(|t| ORDINAL_DATE.is_match(t))
        .map(|t| dates::normalize_ordinal(&t))
        .transpose()?;

    let author_link = select_first(&doc, "a[data-state='closed']")?
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    let from_url = author_from_url(url);
    let authors = select_text(&doc, "div._2gklefg")?.or(from_url.name);

    let content = match select_first(&doc, ".css-72ne1l > div:nth-child(1)")? {
        Some(container) => Some(blocks_to_markdown(container, CONTENT_TAGS_WITH_DIV, "\n")?),
        None => None,
    };

    Ok(DetailRecord {
        title: page_title(&doc)?,
        authors,
        authors_urls: author_link.or(from_url.url),
        release_date,
        content,
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_from_url() {
        let sub = author_from_url("https://alice.mirror.xyz/abc123");
        assert_eq!(sub.name.as_deref(), Some("alice"));
        assert_eq!(sub.url.as_deref(), Some("https://alice.mirror.xyz/alice"));
        assert!(sub.is_website);

        let ens = author_from_url("https://mirror.xyz/bob.eth/xyz");
        assert_eq!(ens.name.as_deref(), Some("bob.eth"));
        assert!(!ens.is_website);

        assert_eq!(author_from_url("https://mirror.xyz/xyz").name, None);
        assert_eq!(author_from_url("not a url").name, None);
    }

    #[test]
    fn test_parse_page() {
        let html = r#"<html><head><title>Order flow auctions</title></head><body>
<a data-state="closed" href="https://mirror.xyz/bob.eth">bob</a>
<span>January 5th, 2023</span>
<div class="css-72ne1l"><div><h2>Why</h2><p>Because <em>reasons</em>.</p></div></div>
</body></html>"#;
        let record = parse_page("https://mirror.xyz/bob.eth/xyz", html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Order flow auctions"));
        assert_eq!(record.release_date.as_deref(), Some("2023-01-05"));
        assert_eq!(record.authors.as_deref(), Some("bob.eth"));
        assert_eq!(record.authors_urls.as_deref(), Some("https://mirror.xyz/bob.eth"));
        let content = record.content.unwrap();
        assert!(content.contains("## Why"));
        assert!(content.contains("reasons"));
    }
}
