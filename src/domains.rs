//! The research-domain allow-list.
//!
//! A growable, ordered, duplicate-free set of URL prefixes (for example
//! `https://www.galaxy.com/insights/research`). Links starting with a known
//! prefix are articles. The list lives in memory while a batch is
//! categorized; the caller persists it afterwards with [`DomainAllowList::save`],
//! which only ever appends.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{HarvestError, Result};
use crate::models::LinkRecord;

/// Path prefix of research-insights pages that teach the list a new domain.
const RESEARCH_INSIGHTS_PATH: &str = "/insights/research/";

#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    entries: Vec<String>,
    seen: HashSet<String>,
    /// Entries already on disk when loaded.
    persisted: usize,
}

impl DomainAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a flat text file, one prefix per line. Blank lines and
    /// duplicate lines are dropped; a missing file is an empty list.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let mut list = Self::new();
        match fs::read_to_string(path) {
            Ok(text) => {
                for line in text.lines() {
                    list.insert(line);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("allow-list file not found, starting empty");
            }
            Err(e) => return Err(HarvestError::io(path, e)),
        }
        list.persisted = list.entries.len();
        info!(count = list.entries.len(), "Loaded domain allow-list");
        Ok(list)
    }

    /// Insert a prefix. Returns `false` when it was already present or blank.
    pub fn insert(&mut self, prefix: &str) -> bool {
        let prefix = prefix.trim();
        if prefix.is_empty() || self.seen.contains(prefix) {
            return false;
        }
        self.seen.insert(prefix.to_string());
        self.entries.push(prefix.to_string());
        true
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.seen.contains(prefix.trim())
    }

    /// Whether `url` starts with any known prefix, ignoring ASCII case.
    pub fn matches(&self, url: &str) -> bool {
        self.entries.iter().any(|prefix| {
            url.len() >= prefix.len()
                && url.is_char_boundary(prefix.len())
                && url[..prefix.len()].eq_ignore_ascii_case(prefix)
        })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries added since the list was loaded.
    pub fn pending(&self) -> &[String] {
        &self.entries[self.persisted..]
    }

    /// Append pending entries to `path`. Entries already in the file are
    /// re-checked so a concurrent append cannot introduce duplicates.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn save(&mut self, path: &Path) -> Result<usize> {
        if self.pending().is_empty() {
            return Ok(0);
        }
        let on_disk = Self::load(path)?;
        let to_write: Vec<&String> = self
            .pending()
            .iter()
            .filter(|entry| !on_disk.contains(entry))
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
        }
        crate::store::ensure_trailing_newline(path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| HarvestError::io(path, e))?;
        for entry in &to_write {
            writeln!(file, "{entry}").map_err(|e| HarvestError::io(path, e))?;
        }
        let written = to_write.len();
        self.persisted = self.entries.len();
        info!(written, "Appended new domains to allow-list");
        Ok(written)
    }
}

/// Learn research-insights domains from a batch of links.
///
/// A link whose path starts with `/insights/research/`, whose host is not a
/// configured research site, contributes `scheme://host/<seg1>/<seg2>`
/// (e.g. `https://www.galaxy.com/insights/research`). Returns how many new
/// prefixes were inserted. Unparsable URLs are ignored.
pub fn grow_allow_list(
    rows: &[LinkRecord],
    research_sites: &[String],
    allow_list: &mut DomainAllowList,
) -> usize {
    let mut added = 0;
    for row in rows {
        let Some(prefix) = research_insights_prefix(&row.url) else {
            continue;
        };
        let host_is_research_site = Url::parse(&row.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .is_some_and(|host| research_sites.iter().any(|site| host.contains(site.as_str())));
        if host_is_research_site {
            continue;
        }
        if allow_list.insert(&prefix) {
            debug!(%prefix, url = %row.url, "Learned research domain");
            added += 1;
        }
    }
    added
}

/// `scheme://host` followed by the first two path segments, for URLs under
/// `/insights/research/`.
fn research_insights_prefix(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    if !path.starts_with(RESEARCH_INSIGHTS_PATH) {
        return None;
    }
    let host = parsed.host_str()?;
    let sub_path = path.split('/').take(3).collect::<Vec<_>>().join("/");
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{host}{port}{sub_path}", parsed.scheme()))
}
