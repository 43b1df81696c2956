//! `categorize`: raw links -> bucket CSVs.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, instrument};

use crate::categorize::{ARTICLES_BUCKET, CategorizeRules, partition};
use crate::config::HarvestConfig;
use crate::domains::{DomainAllowList, grow_allow_list};
use crate::error::Result;
use crate::models::{ARTICLE_COLUMNS, LINK_COLUMNS};
use crate::store::{Table, UpsertStats, ensure_trailing_newline, read_links, upsert};

/// What one categorize pass did.
#[derive(Debug, Default)]
pub struct CategorizeSummary {
    pub input_rows: usize,
    /// Prefixes the allow-list learned this pass.
    pub learned_domains: usize,
    pub buckets: BTreeMap<String, UpsertStats>,
    /// Rows written back to the input for the next pass.
    pub remainder: usize,
}

/// Key column of a bucket file: `article` for articles, `paper` otherwise.
pub fn bucket_key_column(bucket: &str) -> &'static str {
    if bucket == ARTICLES_BUCKET {
        ARTICLE_COLUMNS[0]
    } else {
        LINK_COLUMNS[0]
    }
}

/// Categorize every link in `input` and merge them into their buckets.
///
/// The allow-list grows before partitioning, so a prefix learned from one
/// row already classifies its siblings. Website rows nobody else claimed are
/// written back to `input`.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn categorize_links(config: &HarvestConfig, input: &Path) -> Result<CategorizeSummary> {
    let rules = CategorizeRules::from_config(config)?;
    let domains_path = config.domains_path();
    let mut allow_list = DomainAllowList::load(&domains_path)?;

    ensure_trailing_newline(input)?;
    let rows = read_links(input, LINK_COLUMNS[0])?;
    let mut summary = CategorizeSummary {
        input_rows: rows.len(),
        ..CategorizeSummary::default()
    };
    if rows.is_empty() {
        info!("No links to categorize");
        return Ok(summary);
    }

    summary.learned_domains = grow_allow_list(&rows, &rules.research_websites, &mut allow_list);
    let parts = partition(&rows, &rules, &allow_list);

    for (bucket, links) in &parts.buckets {
        let key = bucket_key_column(bucket);
        let stats = upsert(&config.bucket_path(bucket), &Table::from_links(key, links), key)?;
        info!(%bucket, added = stats.added(), total = stats.total, "Bucket updated");
        summary.buckets.insert(bucket.clone(), stats);
    }

    allow_list.save(&domains_path)?;
    Table::from_links(LINK_COLUMNS[0], &parts.remainder).write(input)?;
    summary.remainder = parts.remainder.len();

    info!(
        input_rows = summary.input_rows,
        learned_domains = summary.learned_domains,
        buckets = summary.buckets.len(),
        remainder = summary.remainder,
        "Categorize pass complete"
    );
    Ok(summary)
}
