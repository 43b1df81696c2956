//! Error types for the harvester.
//!
//! Fetch, parse and date errors never leave a fetcher: they are logged and
//! turned into [`DetailRecord::EMPTY`](crate::models::DetailRecord::EMPTY).
//! Store and configuration errors propagate to `main`.

use std::path::PathBuf;

/// Every failure the harvester can name.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Transport failure or a non-success HTTP status.
    #[error("http error for {url}: {message}")]
    Http {
        url: String,
        message: String,
        retryable: bool,
    },

    /// An element the page layout guarantees was not found.
    #[error("parse error: {0}")]
    Parse(String),

    /// A date string did not match any accepted format.
    #[error("unrecognised date {input:?}")]
    Date { input: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn date(input: impl Into<String>) -> Self {
        Self::Date {
            input: input.into(),
        }
    }

    pub fn http(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            message: message.to_string(),
            retryable: false,
        }
    }

    /// An HTTP failure worth retrying (rate limiting, 5xx, timeouts).
    pub fn http_retryable(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            message: message.to_string(),
            retryable: true,
        }
    }

    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = HarvestError::date("31 Foo 2023");
        assert_eq!(err.to_string(), "unrecognised date \"31 Foo 2023\"");

        let err = HarvestError::parse("missing h1");
        assert_eq!(err.to_string(), "parse error: missing h1");
    }

    #[test]
    fn test_transient_classification() {
        assert!(HarvestError::http_retryable("u", "status 503").is_transient());
        assert!(!HarvestError::http("u", "status 404").is_transient());
        assert!(!HarvestError::parse("x").is_transient());
    }
}
