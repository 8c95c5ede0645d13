//! HTML retrieval for scraped civic sources.

use crate::app_config::ScraperConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Fetch errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    Status(u16),
    /// Connection, TLS, timeout or body read failure
    Transport(String),
    /// Body exceeded the configured size limit
    TooLarge,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "HTTP status {}", code),
            FetchError::Transport(msg) => write!(f, "Transport error: {}", msg),
            FetchError::TooLarge => write!(f, "Response too large"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Anything that can hand back the HTML for a URL.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Why a source fell back to sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackReason {
    Unreachable,
    HttpStatus,
    NoRecords,
}

impl From<&FetchError> for FallbackReason {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::Status(_) => FallbackReason::HttpStatus,
            FetchError::Transport(_) | FetchError::TooLarge => FallbackReason::Unreachable,
        }
    }
}

/// Outcome of scraping one source. Never an error: callers decide what a
/// fallback means.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceResult<T> {
    Live(Vec<T>),
    Fallback(FallbackReason),
}

impl<T> DataSourceResult<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSourceResult::Fallback(_))
    }
}

/// Fetch `url` and run `parse` over the body. Fetch failures and empty
/// parses both become a `Fallback`.
pub async fn scrape<T, F>(source: &dyn HtmlSource, url: &str, parse: F) -> DataSourceResult<T>
where
    F: FnOnce(&str) -> Vec<T>,
{
    match source.fetch(url).await {
        Ok(html) => {
            let records = parse(&html);
            if records.is_empty() {
                log::warn!("No records matched at {}", url);
                DataSourceResult::Fallback(FallbackReason::NoRecords)
            } else {
                log::info!("Scraped {} records from {}", records.len(), url);
                DataSourceResult::Live(records)
            }
        }
        Err(e) => {
            log::warn!("Failed to fetch {}: {}", url, e);
            DataSourceResult::Fallback(FallbackReason::from(&e))
        }
    }
}

/// `reqwest`-backed fetcher with a fixed user agent, a per-request timeout
/// and a bounded number of attempts separated by a fixed pause.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response: {}", e)))?;

        if body.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl HtmlSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                // Oversized bodies won't shrink on retry.
                Err(FetchError::TooLarge) => return Err(FetchError::TooLarge),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    log::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        e
                    );
                    attempt += 1;
                    actix_web::rt::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
