//! The three harvester commands.
//!
//! - [`links`]: categorize raw links into bucket CSVs and grow the allow-list
//! - [`papers`]: fetch paper details for paper buckets into `paper_details.csv`
//! - [`articles`]: fetch article bodies, write Markdown documents and fill in
//!   article metadata
//!
//! Fetching commands run a dry run unless `fetch` is set: they report the
//! rows they would fetch and make no network calls.

pub mod articles;
pub mod links;
pub mod papers;

use tracing::info;

use crate::models::LinkRecord;

/// Log what a fetching command would do, without doing it.
fn report_dry_run(command: &str, rows: &[LinkRecord]) {
    for row in rows {
        info!(command, url = %row.url, referrer = %row.referrer, "Would fetch");
    }
    info!(command, count = rows.len(), "Dry run; pass --fetch (or HARVEST_FETCH=true) to fetch");
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::{HarvestError, Result};
    use crate::fetchers::{DetailFetcher, FetcherRegistry};
    use crate::http::HttpClient;
    use crate::models::DetailRecord;

    /// Answers from the URL alone: `.../broken` fails, `.../sparse` has a
    /// title only, anything else gets a full record named after its last
    /// path segment.
    pub struct Canned;

    #[async_trait]
    impl DetailFetcher for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn scrape(&self, _http: &HttpClient, url: &str) -> Result<DetailRecord> {
            let last = url.rsplit('/').next().unwrap_or_default();
            if last == "broken" {
                return Err(HarvestError::parse("layout changed"));
            }
            let title = Some(format!("Title of {last}"));
            if last == "sparse" {
                return Ok(DetailRecord {
                    title,
                    ..DetailRecord::EMPTY
                });
            }
            Ok(DetailRecord {
                title,
                authors: Some("alice".into()),
                pdf_link: Some(url.to_string()),
                topics: Some("canned".into()),
                release_date: Some("2023-01-05".into()),
                content: Some(format!("Body of {last}.")),
                ..DetailRecord::EMPTY
            })
        }
    }

    /// Routes `pattern` to [`Canned`].
    pub fn registry(pattern: &str) -> FetcherRegistry {
        FetcherRegistry::new().route(pattern, Arc::new(Canned))
    }
}
