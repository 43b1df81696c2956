//! HTTP access with exponential backoff retry.
//!
//! Every detail fetcher goes through one shared [`HttpClient`]:
//! - [`FetchAsync`]: core trait for a GET returning the response body
//! - [`ReqwestSource`]: the `reqwest` transport (timeout, browser user agent)
//! - [`RetryFetch`]: decorator that retries transient failures
//!
//! # Retry Strategy
//!
//! Only failures flagged retryable are retried: HTTP 429, 5xx, timeouts and
//! connection errors. A 404 or a parse problem fails immediately.
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..250ms)
//! ```

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use rand::{Rng, rng};
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::error::{HarvestError, Result};

/// A successful GET.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL after redirects.
    pub final_url: String,
    pub body: Vec<u8>,
}

impl Fetched {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Async GET abstraction, so retry can wrap any transport.
pub trait FetchAsync {
    async fn get(&self, url: &str) -> Result<Fetched>;
}

/// The `reqwest` transport.
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HarvestError::Config(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl FetchAsync for ReqwestSource {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<Fetched> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }
        let final_url = resp.url().to_string();
        let body = resp.bytes().await.map_err(|e| transport_error(url, e))?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET ok"
        );
        Ok(Fetched {
            final_url,
            body: body.to_vec(),
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> HarvestError {
    if e.is_timeout() || e.is_connect() {
        HarvestError::http_retryable(url, e)
    } else {
        HarvestError::http(url, e)
    }
}

fn status_error(url: &str, status: StatusCode) -> HarvestError {
    let message = format!("status {status}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        HarvestError::http_retryable(url, message)
    } else {
        HarvestError::http(url, message)
    }
}

/// Wrapper that adds exponential backoff retry to any [`FetchAsync`].
pub struct RetryFetch<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt - 1).min(16) as u32;
        let mut delay = self.base_delay.saturating_mul(1 << shift);
        if delay > self.max_delay {
            delay = self.max_delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchAsync for RetryFetch<T>
where
    T: FetchAsync,
{
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<Fetched> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.get(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "GET exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "GET attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The client handed to every fetcher.
#[derive(Debug)]
pub struct HttpClient {
    inner: RetryFetch<ReqwestSource>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let source = ReqwestSource::new(config)?;
        Ok(Self {
            inner: RetryFetch::new(
                source,
                config.max_retries,
                StdDuration::from_millis(config.base_delay_ms),
            ),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Fetched> {
        self.inner.get(url).await
    }

    /// GET and decode the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.inner.get(url).await?.text())
    }

    /// GET with query parameters appended to `base`.
    pub async fn get_text_with_query(&self, base: &str, params: &[(&str, &str)]) -> Result<String> {
        let url = url::Url::parse_with_params(base, params)?;
        self.get_text(url.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config() -> HttpConfig {
        HttpConfig {
            timeout_secs: 5,
            max_retries: 2,
            base_delay_ms: 1,
            ..HttpConfig::default()
        }
    }

    /// Fails with the given error a fixed number of times, then succeeds.
    struct Flaky {
        failures: usize,
        retryable: bool,
        calls: AtomicUsize,
    }

    impl FetchAsync for Flaky {
        async fn get(&self, url: &str) -> Result<Fetched> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(if self.retryable {
                    HarvestError::http_retryable(url, "status 503")
                } else {
                    HarvestError::http(url, "status 404")
                });
            }
            Ok(Fetched {
                final_url: url.to_string(),
                body: b"ok".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = Flaky {
            failures: 2,
            retryable: true,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryFetch::new(flaky, 3, StdDuration::from_millis(1));
        let fetched = retry.get("http://x").await.unwrap();
        assert_eq!(fetched.text(), "ok");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let flaky = Flaky {
            failures: 10,
            retryable: true,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryFetch::new(flaky, 2, StdDuration::from_millis(1));
        assert!(retry.get("http://x").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let flaky = Flaky {
            failures: 1,
            retryable: false,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryFetch::new(flaky, 5, StdDuration::from_millis(1));
        assert!(retry.get("http://x").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let flaky = Flaky {
            failures: 0,
            retryable: true,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryFetch::new(flaky, 5, StdDuration::from_secs(10));
        let delay = retry.backoff(10);
        assert!(delay >= StdDuration::from_secs(30));
        assert!(delay <= StdDuration::from_millis(30_250));
    }

    #[tokio::test]
    async fn test_client_retries_rate_limited_response() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/paper"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/paper"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<h1>ok</h1>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(&fast_config()).unwrap();
        let body = client.get_text(&format!("{}/paper", server.uri())).await.unwrap();
        assert_eq!(body, "<h1>ok</h1>");
    }

    #[tokio::test]
    async fn test_client_not_found_is_permanent() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&fast_config()).unwrap();
        let err = client.get_text(&format!("{}/gone", server.uri())).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("404"));
    }
}
