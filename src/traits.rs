use crate::types::{ChatMessage, Result, ScoutError};
use async_trait::async_trait;

/// Single-shot text completion used for every classification step.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Human-readable name of the provider behind this classifier
    fn classifier_name(&self) -> String;

    /// Send the ordered messages and return the raw completion text.
    /// Callers are expected to handle failures themselves.
    async fn classify(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Retrieves event pages and the calendar feed itself.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch an event page body.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Fetch the calendar feed. Any failure is a `FeedFetch` error.
    async fn fetch_feed(&self, url: &str) -> Result<String> {
        self.fetch(url).await.map_err(|e| match e {
            ScoutError::FeedFetch { .. } => e,
            other => ScoutError::FeedFetch {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })
    }
}
