//! CSV bucket store.
//!
//! Bucket files are small enough to rewrite on every merge: a merge loads the
//! existing rows, appends the new ones, drops duplicate keys keeping the first
//! occurrence (existing rows win), and writes the whole file back through a
//! temp file renamed over the target. A crash leaves either the old or the
//! new file, never a half-written one.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::error::{HarvestError, Result};
use crate::models::LinkRecord;

/// An in-memory CSV table: ordered header plus string rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Link rows under `url_column` / `referrer`.
    pub fn from_links(url_column: &str, links: &[LinkRecord]) -> Self {
        let mut table = Self::new(&[url_column, "referrer"]);
        for link in links {
            table.push_row(vec![link.url.clone(), link.referrer.clone()]);
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Add a column (filled with empty strings) unless it already exists.
    /// Returns its index.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Value of `column` in row `idx`.
    pub fn get(&self, idx: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(idx).map(|row| row[col].as_str())
    }

    /// Values of one column, in row order. Missing column -> empty.
    pub fn column(&self, name: &str) -> Vec<String> {
        match self.column_index(name) {
            Some(col) => self.rows.iter().map(|row| row[col].clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Rows of `other` appended after this table's rows, aligned by column
    /// name. Columns only `other` has are appended to the header.
    pub fn concat(mut self, other: &Table) -> Table {
        let mapping: Vec<usize> = other.headers.iter().map(|h| self.ensure_column(h)).collect();
        for row in &other.rows {
            let mut aligned = vec![String::new(); self.headers.len()];
            for (src, dst) in mapping.iter().enumerate() {
                aligned[*dst] = row[src].clone();
            }
            self.rows.push(aligned);
        }
        self
    }

    /// Drop rows whose `key` value was already seen, keeping the first.
    pub fn dedup_by_key(mut self, key: &str) -> Result<Table> {
        let col = self
            .column_index(key)
            .ok_or_else(|| HarvestError::parse(format!("key column {key:?} missing")))?;
        self.rows = self
            .rows
            .into_iter()
            .unique_by(|row| row[col].clone())
            .collect();
        Ok(self)
    }

    /// Read a table. A missing or empty file yields an empty, header-less table.
    pub fn read(path: &Path) -> Result<Table> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() == 0 => return Ok(Table::default()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::default()),
            Err(e) => return Err(HarvestError::io(path, e)),
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let mut table = Table::new(&reader.headers()?.iter().collect::<Vec<_>>());
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > table.headers.len() {
                warn!(
                    path = %path.display(),
                    row = idx + 2,
                    fields = record.len(),
                    columns = table.headers.len(),
                    "Row is wider than the header; extra fields dropped"
                );
            }
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    /// Write the table to `path` atomically (temp file in the same directory,
    /// then rename).
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))?;
        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| HarvestError::io(dir, e))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush().map_err(|e| HarvestError::io(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| HarvestError::io(path, e.error))?;
        Ok(())
    }
}

/// Append `\n` to a non-empty file that does not already end with one.
///
/// A previous partial write can leave the last row unterminated; appending
/// right after it would glue two rows together.
pub fn ensure_trailing_newline(path: &Path) -> Result<()> {
    let mut file = match fs::OpenOptions::new().read(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(HarvestError::io(path, e)),
    };
    let len = file.metadata().map_err(|e| HarvestError::io(path, e))?.len();
    if len == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| HarvestError::io(path, e))?;
    if last[0] != b'\n' {
        warn!(path = %path.display(), "File did not end with a newline, repairing");
        file.write_all(b"\n").map_err(|e| HarvestError::io(path, e))?;
    }
    Ok(())
}

/// Row counts of one [`upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStats {
    pub existing: usize,
    pub incoming: usize,
    pub total: usize,
}

impl UpsertStats {
    /// Rows the merge actually added. Zero when collapsing duplicate keys
    /// already in the file shrank it.
    pub fn added(&self) -> usize {
        self.total.saturating_sub(self.existing)
    }
}

/// Merge `new_rows` into the CSV at `path`, unique by `key_field`.
///
/// Existing rows win over new rows on key collision, and duplicate keys
/// inside `new_rows` keep their first occurrence. If the file is absent or
/// empty it is created with `new_rows`' header.
#[instrument(level = "info", skip_all, fields(path = %path.display(), key = key_field))]
pub fn upsert(path: &Path, new_rows: &Table, key_field: &str) -> Result<UpsertStats> {
    ensure_trailing_newline(path)?;
    let existing = Table::read(path)?;
    let existing_len = existing.len();

    let base = if existing.headers().is_empty() {
        Table::new(new_rows.headers())
    } else {
        existing
    };
    // Rows of an existing file that already hold duplicate keys are collapsed
    // too, so the output is unique even if the file was edited by hand.
    let merged = base.concat(new_rows).dedup_by_key(key_field)?;
    merged.write(path)?;

    let stats = UpsertStats {
        existing: existing_len,
        incoming: new_rows.len(),
        total: merged.len(),
    };
    info!(
        existing = stats.existing,
        incoming = stats.incoming,
        total = stats.total,
        "Merged rows into bucket"
    );
    Ok(stats)
}

/// Field values to set on one keyed row.
pub type RowUpdate = HashMap<String, String>;

/// Set fields on existing rows matched by `key_field`, then rewrite the file.
///
/// Missing columns are added. Empty values in an update are ignored so a
/// sparse result never blanks a field. Keys with no matching row are skipped.
/// Returns the number of rows changed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), key = key_field, updates = updates.len()))]
pub fn update_rows(path: &Path, updates: &HashMap<String, RowUpdate>, key_field: &str) -> Result<usize> {
    if updates.is_empty() {
        return Ok(0);
    }
    ensure_trailing_newline(path)?;
    let mut table = Table::read(path)?;
    let key_col = table
        .column_index(key_field)
        .ok_or_else(|| HarvestError::parse(format!("key column {key_field:?} missing in {}", path.display())))?;

    let mut changed = 0;
    for (key, fields) in updates {
        let Some(row_idx) = table.rows.iter().position(|row| &row[key_col] == key) else {
            debug!(%key, "No row for update");
            continue;
        };
        let mut touched = false;
        for (column, value) in fields {
            if value.trim().is_empty() {
                continue;
            }
            let col = table.ensure_column(column);
            if table.rows[row_idx][col] != *value {
                table.rows[row_idx][col] = value.clone();
                touched = true;
            }
        }
        if touched {
            changed += 1;
        }
    }
    table.write(path)?;
    info!(changed, "Updated rows in place");
    Ok(changed)
}

/// `(url, referrer)` pairs from a link CSV; a missing file is empty.
pub fn read_links(path: &Path, url_column: &str) -> Result<Vec<LinkRecord>> {
    let table = Table::read(path)?;
    if table.headers().is_empty() {
        return Ok(Vec::new());
    }
    let url_col = table
        .column_index(url_column)
        .ok_or_else(|| HarvestError::parse(format!("column {url_column:?} missing in {}", path.display())))?;
    let referrer_col = table.column_index("referrer");
    Ok(table
        .rows()
        .iter()
        .filter(|row| !row[url_col].trim().is_empty())
        .map(|row| LinkRecord {
            url: row[url_col].trim().to_string(),
            referrer: referrer_col.map(|c| row[c].clone()).unwrap_or_default(),
        })
        .collect())
}

/// All values of `column` (e.g. existing paper titles); missing file or
/// column -> empty.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>> {
    Ok(Table::read(path)?.column(column))
}
