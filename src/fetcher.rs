use crate::traits::PageFetcher;
use crate::types::{FetchConfig, Result, ScoutError};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download the calendar feed, retrying transient failures with exponential backoff.
    pub async fn fetch_feed_with_retries(&self, url: &str) -> Result<String> {
        Url::parse(url).map_err(|e| ScoutError::FeedFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let start_time = Instant::now();

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.get_text(url).await {
                Ok(content) => {
                    info!(
                        "Fetched feed {} ({} bytes in {}ms)",
                        url,
                        content.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch feed after {} attempts: {}", self.config.max_retries + 1, url);

        Err(ScoutError::FeedFetch {
            url: url.to_string(),
            reason,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ScoutError::EventFetch {
                url: url.to_string(),
                reason: format!("HTTP {}: {}", status, status.canonical_reason().unwrap_or("Unknown")),
            });
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_body_size_mb {
                return Err(ScoutError::EventFetch {
                    url: url.to_string(),
                    reason: format!("Body too large: {}MB", size_mb),
                });
            }
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    /// Single attempt; the enrichment step records a failure instead of retrying.
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching event page: {}", url);
        self.get_text(url).await.map_err(|e| match e {
            ScoutError::EventFetch { .. } => e,
            other => ScoutError::EventFetch {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        self.fetch_feed_with_retries(url).await
    }
}
