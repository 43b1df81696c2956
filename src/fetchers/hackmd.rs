//! HackMD notes (hackmd.io and the notes.ethereum.org instance).

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::instrument;
use url::Url;

use super::DetailFetcher;
use super::html::{page_title, select_first, select_first_in, structured_text};
use crate::dates;
use crate::error::{HarvestError, Result};
use crate::http::HttpClient;
use crate::models::DetailRecord;

pub struct HackMdFetcher;

/// Author named by an `/@author/...` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteAuthor {
    pub name: String,
    pub url: String,
    /// `/@author` alone is the author's profile, not a note.
    pub is_website: bool,
}

pub fn author_from_url(url: &str) -> Option<NoteAuthor> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let name = segments.first()?.strip_prefix('@')?;
    if name.is_empty() {
        return None;
    }
    let is_website = segments.len() == 1 || (segments.len() == 2 && segments[1].is_empty());
    Some(NoteAuthor {
        name: name.to_string(),
        url: format!("https://hackmd.io/@{name}"),
        is_website,
    })
}

#[async_trait]
impl DetailFetcher for HackMdFetcher {
    fn name(&self) -> &'static str {
        "hackmd"
    }

    #[instrument(level = "info", skip(self, http))]
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord> {
        let author = author_from_url(url);
        if author.as_ref().is_some_and(|a| a.is_website) {
            return Err(HarvestError::parse(format!("{url} is a profile page, not a note")));
        }
        let body = http.get_text(url).await?;
        parse_page(author, &body)
    }
}

pub fn parse_page(author: Option<NoteAuthor>, html: &str) -> Result<DetailRecord> {
    let doc = Html::parse_document(html);

    // The creation timestamp sits on a sibling of the "last changed" badge.
    let created = match select_first(&doc, ".ui-status-lastchange")?
        .and_then(|badge| badge.parent())
        .and_then(ElementRef::wrap)
    {
        Some(status) => select_first_in(status, "[data-createtime]")?
            .and_then(|el| el.value().attr("data-createtime"))
            .map(dates::from_epoch_millis)
            .transpose()?,
        None => None,
    };

    let content = select_first(&doc, "div#doc")?.map(structured_text);
    let (authors, authors_urls) = match author {
        Some(a) => (Some(a.name), Some(a.url)),
        None => (None, None),
    };

    Ok(DetailRecord {
        title: page_title(&doc)?,
        authors,
        authors_urls,
        release_date: created,
        content,
        ..DetailRecord::EMPTY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_from_url() {
        let note = author_from_url("https://hackmd.io/@alice/pbs-notes").unwrap();
        assert_eq!(note.name, "alice");
        assert_eq!(note.url, "https://hackmd.io/@alice");
        assert!(!note.is_website);

        assert!(author_from_url("https://hackmd.io/@alice").unwrap().is_website);
        assert!(author_from_url("https://hackmd.io/@alice/").unwrap().is_website);
        assert_eq!(author_from_url("https://notes.ethereum.org/s8Kq1"), None);
    }

    #[test]
    fn test_parse_page() {
        let html = r#"<html><head><title>PBS notes - HackMD</title></head><body>
<div class="ui-status"><span class="ui-status-lastchange">changed</span>
<span class="ui-lastchange" data-createtime="1675245600000">a year ago</span></div>
<div id="doc"><h1>PBS</h1><p>See <a href="https://ethresear.ch">the forum</a></p></div>
</body></html>"#;
        let author = author_from_url("https://hackmd.io/@alice/pbs-notes");
        let record = parse_page(author, html).unwrap();
        assert_eq!(record.title.as_deref(), Some("PBS notes - HackMD"));
        assert_eq!(record.release_date.as_deref(), Some("2023-02-01"));
        assert_eq!(record.authors.as_deref(), Some("alice"));
        assert_eq!(record.content.as_deref(), Some("PBS\n\nSee [the forum](https://ethresear.ch)"));
    }

    #[tokio::test]
    async fn test_profile_page_is_empty() {
        let record = HackMdFetcher
            .fetch(&crate::fetchers::testing::client(), "https://hackmd.io/@alice")
            .await;
        assert!(record.is_empty());
    }
}
