//! Release-date normalisation.
//!
//! Every source prints dates differently ("12 Jan 2023", "January 5th, 2023",
//! "8.24.23", epoch millis, ...). These helpers turn them into `YYYY-MM-DD`.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HarvestError, Result};

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})(st|nd|rd|th)\b").expect("static regex"));

/// Parse `input` with the first matching `chrono` format and render it as
/// `YYYY-MM-DD`.
pub fn normalize(input: &str, formats: &[&str]) -> Result<String> {
    let trimmed = collapse_whitespace(input);
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&trimmed, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| HarvestError::date(input))
}

/// Like [`normalize`] for dates printed without a year ("Jan 5",
/// "March 3"); the current year is assumed.
pub fn normalize_without_year(input: &str, formats: &[&str]) -> Result<String> {
    let with_year = format!("{} {}", collapse_whitespace(input), Local::now().year());
    let formats: Vec<String> = formats.iter().map(|f| format!("{f} %Y")).collect();
    let formats: Vec<&str> = formats.iter().map(String::as_str).collect();
    normalize(&with_year, &formats).map_err(|_| HarvestError::date(input))
}

/// Month-only dates ("March 2021") resolve to the first of the month.
pub fn normalize_month_year(input: &str) -> Result<String> {
    normalize(&format!("1 {}", collapse_whitespace(input)), &["%d %B %Y", "%d %b %Y"])
        .map_err(|_| HarvestError::date(input))
}

/// "January 5th, 2023" -> "2023-01-05".
pub fn normalize_ordinal(input: &str) -> Result<String> {
    let stripped = ORDINAL_SUFFIX.replace_all(input, "$1");
    normalize(&stripped, &["%B %d, %Y", "%b %d, %Y"]).map_err(|_| HarvestError::date(input))
}

/// Two-digit-year dotted dates ("8.24.23"), resolved into the current century.
pub fn normalize_dotted_short_year(input: &str) -> Result<String> {
    let parts: Vec<&str> = input.trim().split('.').collect();
    let [month, day, year] = parts.as_slice() else {
        return Err(HarvestError::date(input));
    };
    let century = Local::now().year() / 100;
    let full = format!("{month}.{day}.{century}{year}");
    normalize(&full, &["%m.%d.%Y"]).map_err(|_| HarvestError::date(input))
}

/// Epoch milliseconds (as printed by HackMD's `data-createtime`).
pub fn from_epoch_millis(input: &str) -> Result<String> {
    let millis: i64 = input.trim().parse().map_err(|_| HarvestError::date(input))?;
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .ok_or_else(|| HarvestError::date(input))
}

/// Keep the date part of an ISO-8601 timestamp ("2023-02-01T10:00:00Z").
pub fn from_iso_timestamp(input: &str) -> Result<String> {
    let date = input.trim().split('T').next().unwrap_or_default();
    normalize(date, &["%Y-%m-%d"]).map_err(|_| HarvestError::date(input))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
