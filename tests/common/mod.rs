#![allow(dead_code)]

use async_trait::async_trait;
use food_scout::prompts;
use food_scout::{ChatMessage, Classifier, NormalizedEvent, PageFetcher, Result, ScoutError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

pub fn is_coarse(messages: &[ChatMessage]) -> bool {
    messages.iter().any(|m| m.content == prompts::COARSE_FILTER)
}

pub fn is_deep(messages: &[ChatMessage]) -> bool {
    messages.iter().any(|m| m.content == prompts::DEEP_CHECK)
}

pub fn is_digest(messages: &[ChatMessage]) -> bool {
    messages.iter().any(|m| m.content.starts_with(prompts::DIGEST))
}

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync>;

/// Classifier answering through a closure and counting calls per stage.
pub struct StubClassifier {
    responder: Responder,
    coarse_calls: AtomicUsize,
    deep_calls: AtomicUsize,
    digest_calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(responder: impl Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            coarse_calls: AtomicUsize::new(0),
            deep_calls: AtomicUsize::new(0),
            digest_calls: AtomicUsize::new(0),
        }
    }

    /// Same answer to every question.
    pub fn always(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::new(move |_| Ok(answer.clone()))
    }

    /// Coarse filter says `coarse`, deep check says `deep`, digest says "digest".
    pub fn staged(coarse: &str, deep: &str) -> Self {
        let coarse = coarse.to_string();
        let deep = deep.to_string();
        Self::new(move |messages| {
            if is_coarse(messages) {
                Ok(coarse.clone())
            } else if is_deep(messages) {
                Ok(deep.clone())
            } else {
                Ok("digest".to_string())
            }
        })
    }

    pub fn coarse_calls(&self) -> usize {
        self.coarse_calls.load(Ordering::SeqCst)
    }

    pub fn deep_calls(&self) -> usize {
        self.deep_calls.load(Ordering::SeqCst)
    }

    pub fn digest_calls(&self) -> usize {
        self.digest_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.coarse_calls() + self.deep_calls() + self.digest_calls()
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn classifier_name(&self) -> String {
        "stub".to_string()
    }

    async fn classify(&self, messages: &[ChatMessage]) -> Result<String> {
        if is_coarse(messages) {
            self.coarse_calls.fetch_add(1, Ordering::SeqCst);
        } else if is_deep(messages) {
            self.deep_calls.fetch_add(1, Ordering::SeqCst);
        } else if is_digest(messages) {
            self.digest_calls.fetch_add(1, Ordering::SeqCst);
        }
        (self.responder)(messages)
    }
}

/// In-memory fetcher serving a fixed feed and fixed pages.
pub struct StubFetcher {
    feed: Option<String>,
    pages: HashMap<String, String>,
    page_calls: AtomicUsize,
    feed_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            feed: None,
            pages: HashMap::new(),
            page_calls: AtomicUsize::new(0),
            feed_calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn feed_calls(&self) -> usize {
        self.feed_calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| ScoutError::EventFetch {
            url: url.to_string(),
            reason: "HTTP 404 Not Found: Not Found".to_string(),
        })
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        self.feed.clone().ok_or_else(|| ScoutError::FeedFetch {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

pub fn event_url(i: usize) -> String {
    format!("https://lu.ma/event-{}", i)
}

/// A calendar with `n` complete events whose descriptions fold over two lines.
pub fn calendar_feed(n: usize) -> String {
    let mut feed = String::from("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//Luma//EN\n");
    for i in 0..n {
        feed.push_str("BEGIN:VEVENT\n");
        feed.push_str(&format!("UID:evt-{}@lu.ma\n", i));
        feed.push_str(&format!("SUMMARY:Event {}\n", i));
        feed.push_str("DTSTART:20250301T180000Z\n");
        feed.push_str("DTEND:20250301T200000Z\n");
        feed.push_str(&format!(
            "DESCRIPTION:Join us for talks and pizza.\\n\\nGet up-to-date information at: {}\\n\n",
            event_url(i)
        ));
        feed.push_str(" \\nHosted by the community\n");
        feed.push_str(&format!("LOCATION:Room {}\n", i));
        feed.push_str("END:VEVENT\n");
    }
    feed.push_str("END:VCALENDAR\n");
    feed
}

pub fn event(i: usize) -> NormalizedEvent {
    NormalizedEvent {
        name: format!("Event {}", i),
        description: format!("Talks and pizza. Get up-to-date information at: {}", event_url(i)),
        location: format!("Room {}", i),
        start: None,
        end: None,
        url: Some(event_url(i)),
    }
}

pub fn events(n: usize) -> Vec<NormalizedEvent> {
    (0..n).map(event).collect()
}
