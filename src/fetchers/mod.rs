//! Per-site detail fetchers.
//!
//! Every source site gets one [`DetailFetcher`]. A fetcher turns a paper or
//! article URL into a [`DetailRecord`]; when the page cannot be fetched or
//! its layout has changed, the error is logged once here and the caller gets
//! [`DetailRecord::EMPTY`].
//!
//! # Supported Sources
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | arXiv | [`arxiv`] | Atom export API |
//! | SSRN | [`ssrn`] | HTML scraping |
//! | IACR ePrint | [`iacr`] | HTML + bibtex |
//! | ACM DL | [`acm`] | HTML scraping |
//! | Nature | [`nature`] | HTML, two layouts |
//! | ResearchGate | [`researchgate`] | HTML scraping |
//! | Discourse forums | [`discourse`] | HTML scraping |
//! | Medium | [`medium`] | HTML + JSON-LD |
//! | Mirror | [`mirror`] | HTML scraping |
//! | frontier.tech | [`frontier`] | Notion-rendered HTML |
//! | Paradigm | [`paradigm`] | HTML scraping |
//! | HackMD / notes.ethereum.org | [`hackmd`] | HTML scraping |
//! | Jump Crypto | [`jump`] | HTML scraping |
//! | Notion sites | [`notion`] | HTML scraping |
//! | dba.xyz | [`dba`] | HTML scraping |
//! | Propeller Heads | [`propellerheads`] | HTML scraping |
//! | a16z | [`a16z`] | HTML scraping |
//!
//! Fetchers download with `await` and then hand the body to a synchronous
//! `parse_*` function, so no parsed document is held across an await point.

pub mod a16z;
pub mod acm;
pub mod arxiv;
pub mod dba;
pub mod discourse;
pub mod frontier;
pub mod hackmd;
pub mod html;
pub mod iacr;
pub mod jump;
pub mod medium;
pub mod mirror;
pub mod nature;
pub mod notion;
pub mod paradigm;
pub mod propellerheads;
pub mod researchgate;
pub mod ssrn;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::DetailRecord;

/// A site-specific URL -> [`DetailRecord`] extractor.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch and parse one page. Errors mean "nothing usable".
    async fn scrape(&self, http: &HttpClient, url: &str) -> Result<DetailRecord>;

    /// [`scrape`](Self::scrape), with failures logged and turned into
    /// [`DetailRecord::EMPTY`].
    async fn fetch(&self, http: &HttpClient, url: &str) -> DetailRecord {
        match self.scrape(http, url).await {
            Ok(record) => {
                debug!(fetcher = self.name(), %url, empty = record.is_empty(), "Fetched details");
                record
            }
            Err(e) => {
                error!(fetcher = self.name(), %url, error = %e, "Detail fetch failed");
                DetailRecord::EMPTY
            }
        }
    }
}

/// URL-substring routes to fetchers, tried in registration order.
#[derive(Default)]
pub struct FetcherRegistry {
    routes: Vec<(String, Arc<dyn DetailFetcher>)>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. `pattern` is matched case-insensitively as a substring.
    pub fn route(mut self, pattern: &str, fetcher: Arc<dyn DetailFetcher>) -> Self {
        self.routes.push((pattern.to_lowercase(), fetcher));
        self
    }

    /// Every built-in fetcher.
    pub fn with_defaults(config: &HarvestConfig) -> Self {
        let discourse: Arc<dyn DetailFetcher> = Arc::new(discourse::DiscourseFetcher);
        let hackmd: Arc<dyn DetailFetcher> = Arc::new(hackmd::HackMdFetcher);
        Self::new()
            .route("arxiv.org", Arc::new(arxiv::ArxivFetcher::new(&config.arxiv_api_url)))
            .route("ssrn.com", Arc::new(ssrn::SsrnFetcher))
            .route("iacr.org", Arc::new(iacr::IacrFetcher))
            .route("dl.acm.org", Arc::new(acm::AcmFetcher))
            .route("nature.com", Arc::new(nature::NatureFetcher))
            .route("researchgate.net", Arc::new(researchgate::ResearchGateFetcher))
            .route("ethresear.ch", Arc::clone(&discourse))
            .route("collective.flashbots.net", Arc::clone(&discourse))
            .route("lido.fi", Arc::clone(&discourse))
            .route("research.anoma", discourse)
            .route("frontier.tech", Arc::new(frontier::FrontierFetcher))
            .route("medium.com", Arc::new(medium::MediumFetcher))
            .route("mirror.xyz", Arc::new(mirror::MirrorFetcher))
            .route("paradigm.xyz", Arc::new(paradigm::ParadigmFetcher))
            .route("hackmd.io", Arc::clone(&hackmd))
            .route("notes.ethereum.org", hackmd)
            .route("jumpcrypto.com", Arc::new(jump::JumpFetcher))
            .route("notion.site", Arc::new(notion::NotionFetcher))
            .route("dba.xyz", Arc::new(dba::DbaFetcher))
            .route("propellerheads.xyz", Arc::new(propellerheads::PropellerHeadsFetcher))
            .route("a16z", Arc::new(a16z::A16zFetcher))
    }

    /// First fetcher whose pattern occurs in `url`.
    pub fn resolve(&self, url: &str) -> Option<&dyn DetailFetcher> {
        let lower = url.to_lowercase();
        self.routes
            .iter()
            .find(|(pattern, _)| lower.contains(pattern.as_str()))
            .map(|(_, fetcher)| fetcher.as_ref())
    }

    /// Fetch `url` with its routed fetcher; no route -> [`DetailRecord::EMPTY`].
    pub async fn fetch(&self, http: &HttpClient, url: &str) -> DetailRecord {
        match self.resolve(url) {
            Some(fetcher) => fetcher.fetch(http, url).await,
            None => {
                warn!(%url, "No fetcher for URL");
                DetailRecord::EMPTY
            }
        }
    }
}
