use crate::html;
use crate::prompts;
use crate::traits::{Classifier, PageFetcher};
use crate::types::{ChatMessage, EnrichmentOutcome, Likelihood, NormalizedEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Characters of page text handed to the deep check.
pub const PAGE_TEXT_LIMIT: usize = 3000;

/// Coarse-filter answers are read strictly: only a bare `true` (any case) counts.
pub fn parse_coarse_response(response: &str) -> bool {
    response.trim().eq_ignore_ascii_case("true")
}

/// Split a `"<tier>, <rationale>"` answer on its first comma.
pub fn parse_deep_response(response: &str) -> (Likelihood, String) {
    match response.split_once(',') {
        Some((tier, rationale)) => (Likelihood::from_tier(tier), rationale.trim().to_string()),
        None => (Likelihood::from_tier(response), String::new()),
    }
}

/// Only `https` pages are fetched.
pub fn is_secure_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.scheme() == "https")
        .unwrap_or(false)
}

fn coarse_messages(event: &NormalizedEvent) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::COARSE_FILTER),
        ChatMessage::user(format!("Event: {}\nDescription: {}", event.name, event.description)),
    ]
}

fn deep_messages(event: &NormalizedEvent, page_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::DEEP_CHECK),
        ChatMessage::user(format!(
            "Event: {}\nFull Event Details: {}",
            event.name,
            html::truncate_chars(page_text, PAGE_TEXT_LIMIT)
        )),
    ]
}

fn outcome(
    event: &NormalizedEvent,
    food_description: impl Into<String>,
    initial_response: impl Into<String>,
    final_response: impl Into<String>,
    likelihood: Likelihood,
) -> EnrichmentOutcome {
    EnrichmentOutcome {
        name: event.name.clone(),
        url: event.url.clone(),
        date: event.start.clone(),
        location: Some(event.location.clone()),
        food_description: food_description.into(),
        initial_response: initial_response.into(),
        final_response: final_response.into(),
        likelihood,
    }
}

/// Run both classification stages for one event. Never fails: every collaborator
/// error is folded into the returned outcome.
pub async fn enrich(
    event: &NormalizedEvent,
    classifier: &dyn Classifier,
    fetcher: &dyn PageFetcher,
) -> EnrichmentOutcome {
    let initial_response = match classifier.classify(&coarse_messages(event)).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Coarse filter failed for {}: {}", event.name, e);
            return outcome(
                event,
                "Classification failed",
                format!("Error: {}", e),
                "Error",
                Likelihood::Unknown,
            );
        }
    };

    if !parse_coarse_response(&initial_response) {
        debug!("No food expected at {}", event.name);
        return outcome(
            event,
            "No food in description",
            initial_response,
            "No food in description",
            Likelihood::NoFoodInDescription,
        );
    }

    let url = match event.url.as_deref() {
        Some(url) if is_secure_url(url) => url,
        other => {
            debug!("No usable URL for {}: {:?}", event.name, other);
            return outcome(event, "No URL to check", initial_response, "No URL", Likelihood::NoUrl);
        }
    };

    let page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Error fetching {} for {}: {}", url, event.name, e);
            return outcome(
                event,
                format!("Error processing URL: {}", e),
                initial_response,
                "Error",
                Likelihood::Error,
            );
        }
    };

    let page_text = html::extract_text(&page);
    match classifier.classify(&deep_messages(event, &page_text)).await {
        Ok(final_response) => {
            let (likelihood, rationale) = parse_deep_response(&final_response);
            outcome(event, rationale, initial_response, final_response, likelihood)
        }
        Err(e) => {
            warn!("Deep check failed for {}: {}", event.name, e);
            outcome(
                event,
                format!("Error classifying event page: {}", e),
                initial_response,
                "Error",
                Likelihood::Error,
            )
        }
    }
}

/// Sequential enrichment over a normalized feed.
pub struct Enricher {
    classifier: Arc<dyn Classifier>,
    fetcher: Arc<dyn PageFetcher>,
    event_delay: Duration,
}

impl Enricher {
    pub fn new(classifier: Arc<dyn Classifier>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            classifier,
            fetcher,
            event_delay: Duration::ZERO,
        }
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    pub async fn enrich(&self, event: &NormalizedEvent) -> EnrichmentOutcome {
        enrich(event, self.classifier.as_ref(), self.fetcher.as_ref()).await
    }

    /// Enrich `events[start..]` in order, producing at most `max_events` outcomes.
    pub async fn enrich_batch(
        &self,
        events: &[NormalizedEvent],
        start: usize,
        max_events: usize,
    ) -> Vec<EnrichmentOutcome> {
        let pending = events.get(start..).unwrap_or(&[]);
        let batch = &pending[..pending.len().min(max_events)];

        info!(
            "Processing events {} to {} of {}",
            start + 1,
            start + batch.len(),
            events.len()
        );

        let mut outcomes = Vec::with_capacity(batch.len());
        for event in batch {
            info!("Processing event: {} ({})", event.name, event.url.as_deref().unwrap_or("no url"));
            let result = self.enrich(event).await;
            info!("{} -> {}", result.name, result.likelihood);
            outcomes.push(result);

            if !self.event_delay.is_zero() {
                tokio::time::sleep(self.event_delay).await;
            }
        }

        outcomes
    }
}
