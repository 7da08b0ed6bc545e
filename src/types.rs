use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fields of a single calendar entry, in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. A repeated key overwrites the earlier value but keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Start or end of an event. Values the normalizer cannot read as a
/// calendar date are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            EventTime::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub name: String,
    pub description: String,
    pub location: String,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub url: Option<String>,
}

/// Likelihood tier attached to every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Likelihood {
    #[serde(rename = "very likely")]
    VeryLikely,
    #[serde(rename = "likely")]
    Likely,
    #[serde(rename = "unlikely")]
    Unlikely,
    #[serde(rename = "very unlikely")]
    VeryUnlikely,
    #[serde(rename = "no url")]
    NoUrl,
    #[serde(rename = "no food in description")]
    NoFoodInDescription,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Likelihood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Likelihood::VeryLikely => "very likely",
            Likelihood::Likely => "likely",
            Likelihood::Unlikely => "unlikely",
            Likelihood::VeryUnlikely => "very unlikely",
            Likelihood::NoUrl => "no url",
            Likelihood::NoFoodInDescription => "no food in description",
            Likelihood::Error => "error",
            Likelihood::Unknown => "unknown",
        }
    }

    /// Read the tier a classifier put in front of its rationale.
    /// Anything outside the four graded tiers is `Unknown`.
    pub fn from_tier(tier: &str) -> Self {
        let tier = tier
            .trim()
            .trim_matches(|c: char| c == '"' || c == '*' || c == '.')
            .to_lowercase();
        match tier.as_str() {
            "very likely" => Likelihood::VeryLikely,
            "likely" => Likelihood::Likely,
            "unlikely" => Likelihood::Unlikely,
            "very unlikely" => Likelihood::VeryUnlikely,
            _ => Likelihood::Unknown,
        }
    }

    /// True for the four tiers produced by a completed deep check.
    pub fn is_graded(&self) -> bool {
        matches!(
            self,
            Likelihood::VeryLikely | Likelihood::Likely | Likelihood::Unlikely | Likelihood::VeryUnlikely
        )
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-event result of enrichment. Never modified after it is appended to a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub name: String,
    pub url: Option<String>,
    pub date: Option<EventTime>,
    pub location: Option<String>,
    pub food_description: String,
    pub initial_response: String,
    pub final_response: String,
    pub likelihood: Likelihood,
}

pub type ResultSet = Vec<EnrichmentOutcome>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMarker {
    pub processed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Persisted result of the final summarization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestReport {
    pub summary: String,
    pub event_count: usize,
    pub processed_at: DateTime<Utc>,
}

/// Snapshot of what the store currently holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub processed: bool,
    pub processed_timestamp: Option<DateTime<Utc>>,
    pub feed_exists: bool,
    pub results_exist: bool,
    pub outcome_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_body_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "food-scout/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
            max_body_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Locations of the files the result store owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub feed: PathBuf,
    pub results: PathBuf,
    pub marker: PathBuf,
    pub digest: PathBuf,
}

impl StoragePaths {
    pub const FEED_FILE: &'static str = "ical_data.ics";
    pub const RESULTS_FILE: &'static str = "event_summary.json";
    pub const MARKER_FILE: &'static str = "processed_flag.json";
    pub const DIGEST_FILE: &'static str = "event_digest.json";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            feed: dir.join(Self::FEED_FILE),
            results: dir.join(Self::RESULTS_FILE),
            marker: dir.join(Self::MARKER_FILE),
            digest: dir.join(Self::DIGEST_FILE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub feed_url: String,
    /// Upper bound on events enriched in one run.
    pub max_events: usize,
    pub force_reprocess: bool,
    pub storage: StoragePaths,
    /// Pause after each event to stay under provider rate limits.
    pub event_delay: Duration,
}

impl PipelineConfig {
    pub const DEFAULT_MAX_EVENTS: usize = 15;
    pub const DEFAULT_EVENT_DELAY_MS: u64 = 500;

    pub fn new(feed_url: impl Into<String>, data_dir: impl AsRef<Path>) -> Self {
        Self {
            feed_url: feed_url.into(),
            max_events: Self::DEFAULT_MAX_EVENTS,
            force_reprocess: false,
            storage: StoragePaths::in_dir(data_dir),
            event_delay: Duration::from_millis(Self::DEFAULT_EVENT_DELAY_MS),
        }
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_force_reprocess(mut self, force: bool) -> Self {
        self.force_reprocess = force;
        self
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    pub fn with_storage(mut self, storage: StoragePaths) -> Self {
        self.storage = storage;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Failed to fetch calendar feed {url}: {reason}")]
    FeedFetch { url: String, reason: String },

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Failed to fetch event page {url}: {reason}")]
    EventFetch { url: String, reason: String },

    #[error("Classification failed: {0}")]
    Classify(String),

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Digest generation failed: {0}")]
    Digest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScoutError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScoutError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
