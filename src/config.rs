//! Harvester configuration.
//!
//! Settings live in an optional YAML file (`--config harvest.yaml`). Every
//! section has defaults, so a missing or partial file is fine. CLI flags
//! override file values.
//!
//! ```yaml
//! data_dir: data
//! workers: 8
//! http:
//!   timeout_secs: 10
//!   max_retries: 3
//! research_websites: [arxiv, ssrn, iacr, nature]
//! url_patterns:
//!   medium_article: '^https://\w+\.medium\.com/.+'
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::categorize::PatternTable;
use crate::error::{HarvestError, Result};

/// Top-level configuration, deserialized from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Root of every file the harvester reads and writes.
    pub data_dir: PathBuf,
    /// Upper bound on concurrent detail fetches.
    pub workers: usize,
    pub http: HttpConfig,
    /// arXiv Atom export endpoint.
    pub arxiv_api_url: String,
    /// Substrings naming research sites; each gets a `<site>_papers` bucket.
    pub research_websites: Vec<String>,
    /// Hosts with their own paper bucket; PDFs elsewhere go to `papers`.
    pub paper_hosts: Vec<String>,
    /// Named regexes whose matches are articles.
    pub url_patterns: BTreeMap<String, String>,
}

/// `http:` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Retries after the first attempt for 429/5xx/timeouts.
    pub max_retries: usize,
    /// First backoff delay; doubles with each retry.
    pub base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into(),
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            workers: 8,
            http: HttpConfig::default(),
            arxiv_api_url: "http://export.arxiv.org/api/query".into(),
            research_websites: [
                "arxiv",
                "ssrn",
                "iacr",
                "pubmed",
                "ieeexplore",
                "springer",
                "sciencedirect",
                "dl.acm",
                "jstor",
                "nature",
                "researchgate",
                "scholar.google",
                "semanticscholar",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            paper_hosts: ["arxiv", "ssrn", "iacr"].into_iter().map(String::from).collect(),
            url_patterns: default_url_patterns(),
        }
    }
}

fn default_url_patterns() -> BTreeMap<String, String> {
    [
        ("notion_site", r"^https://[^/]+/[^/]+$"),
        ("medium_article", r"^https://\w+\.medium\.com/.+"),
        ("blog_metrika_article", r"^https://blog\.metrika\.co/.+"),
        ("mirror_xyz_article", r"^https://\w+\.mirror\.xyz/.+"),
        ("mirror_xyz_website", r"^https://mirror\.xyz/.+"),
        ("drive_google_article", r"^https://drive\.google\.com/file/d/.+"),
        ("galaxy_insights_article", r"^https://www\.galaxy\.com/insights/.+/.+"),
        ("galaxy_insights_website", r"^https://www\.galaxy\.com/insights/.+"),
        ("ethereum_notes_website", r"^https://notes\.ethereum\.org/@[^/]+/$"),
        ("ethereum_notes_article", r"^https://notes\.ethereum\.org/@[^/]+/[^/]+$"),
        ("medium_article_2", r"^https://medium\.com/.+/.+"),
        ("medium_website", r"^https://medium\.com/.+"),
        ("twitter_website", r"^https://twitter\.com/[^/]+/$"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
    .collect()
}

impl HarvestConfig {
    /// Reject a `url_patterns` entry that is not a valid regex.
    pub fn validate(&self) -> Result<()> {
        PatternTable::compile(&self.url_patterns)?;
        Ok(())
    }

    /// `<data_dir>/links`: bucket CSVs, the raw input and the allow-list.
    pub fn links_dir(&self) -> PathBuf {
        self.data_dir.join("links")
    }

    /// Raw links waiting to be categorized.
    pub fn to_parse_path(&self) -> PathBuf {
        self.links_dir().join("to_parse.csv")
    }

    /// The research-domain allow-list.
    pub fn domains_path(&self) -> PathBuf {
        self.links_dir().join("websites.txt")
    }

    pub fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.links_dir().join(format!("{bucket}.csv"))
    }

    pub fn paper_details_path(&self) -> PathBuf {
        self.data_dir.join("paper_details.csv")
    }

    /// Downloaded paper PDFs.
    pub fn papers_dir(&self) -> PathBuf {
        self.data_dir.join("papers")
    }

    /// Rendered article documents.
    pub fn articles_dir(&self) -> PathBuf {
        self.data_dir.join("articles")
    }
}

/// Load configuration from `path`, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<HarvestConfig> {
    let Some(path) = path else {
        tracing::debug!("no config file given, using defaults");
        return Ok(HarvestConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
    let config = parse_config(&content)
        .map_err(|e| HarvestError::Config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

fn parse_config(content: &str) -> std::result::Result<HarvestConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(HarvestConfig::default());
    }
    serde_yaml::from_str(content)
}
