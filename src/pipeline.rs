use crate::digest::{digest_report, summarize};
use crate::enrichment::Enricher;
use crate::normalizer::normalize;
use crate::state::ResultStore;
use crate::tokenizer::tokenize_feed;
use crate::traits::{Classifier, PageFetcher};
use crate::types::{NormalizedEvent, PipelineConfig, Result, ResultSet, ScoutError};
use std::sync::Arc;
use tracing::{info, warn};

/// What a call to [`FoodScoutPipeline::run`] did.
#[derive(Debug, Clone)]
pub enum RunReport {
    /// The store was already fully processed and no reprocess was requested.
    Skipped { outcomes: ResultSet },
    Completed(RunSummary),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Events enriched during this run.
    pub new_outcomes: usize,
    pub total_events: usize,
    /// Events still waiting for a later run.
    pub remaining: usize,
    pub fully_processed: bool,
    pub outcomes: ResultSet,
    pub digest: String,
}

impl RunReport {
    pub fn outcomes(&self) -> &ResultSet {
        match self {
            RunReport::Skipped { outcomes } => outcomes,
            RunReport::Completed(summary) => &summary.outcomes,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RunReport::Skipped { .. })
    }
}

/// Feed → tokenize → normalize → enrich → persist → digest, one event at a time.
pub struct FoodScoutPipeline {
    config: PipelineConfig,
    store: ResultStore,
    classifier: Arc<dyn Classifier>,
    fetcher: Arc<dyn PageFetcher>,
}

impl FoodScoutPipeline {
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self> {
        if config.max_events == 0 {
            return Err(ScoutError::Config("max_events must be at least 1".to_string()));
        }

        let store = ResultStore::new(config.storage.clone());
        info!(
            "Pipeline ready (classifier: {}, max events per run: {})",
            classifier.classifier_name(),
            config.max_events
        );

        Ok(Self {
            config,
            store,
            classifier,
            fetcher,
        })
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        let force = self.config.force_reprocess;

        if !force && self.store.is_processed().await {
            info!("Feed already processed; pass force_reprocess to run again");
            return Ok(RunReport::Skipped {
                outcomes: self.store.load().await,
            });
        }

        let events = self.load_events().await?;

        let existing = if force {
            self.store.clear_processed().await?;
            info!("Force reprocess requested; discarding stored outcomes");
            ResultSet::new()
        } else {
            self.store.load().await
        };

        let start = existing.len();
        if start > events.len() {
            warn!(
                "Store holds {} outcomes but the feed only has {} events; the feed has changed",
                start,
                events.len()
            );
        } else if start > 0 {
            info!("Resuming after {} already processed events", start);
        }

        let enricher = Enricher::new(self.classifier.clone(), self.fetcher.clone())
            .with_event_delay(self.config.event_delay);
        let new_outcomes = enricher
            .enrich_batch(&events, start, self.config.max_events)
            .await;
        let new_count = new_outcomes.len();

        let outcomes = self.store.append_and_persist(existing, new_outcomes).await?;

        let remaining = events.len().saturating_sub(outcomes.len());
        let fully_processed = remaining == 0;
        if fully_processed {
            self.store.mark_processed().await?;
            info!("All {} events processed", events.len());
        } else {
            info!("Processed {} events; {} left for the next run", new_count, remaining);
        }

        let digest = summarize(&outcomes, self.classifier.as_ref()).await?;
        self.store
            .save_digest(&digest_report(digest.clone(), outcomes.len()))
            .await?;

        Ok(RunReport::Completed(RunSummary {
            new_outcomes: new_count,
            total_events: events.len(),
            remaining,
            fully_processed,
            outcomes,
            digest,
        }))
    }

    /// Normalized events from the stored feed, or from a fresh fetch when there
    /// is none or a reprocess was forced.
    async fn load_events(&self) -> Result<Vec<NormalizedEvent>> {
        let stored = if self.config.force_reprocess {
            None
        } else {
            self.store.load_feed().await?
        };

        let records = match stored {
            Some(raw) => {
                info!("Reading feed data from {}", self.store.paths().feed.display());
                tokenize_feed(&raw)?
            }
            None => {
                if self.config.feed_url.trim().is_empty() {
                    return Err(ScoutError::Config("no feed URL configured".to_string()));
                }
                let raw = self.fetcher.fetch_feed(&self.config.feed_url).await?;
                let records = tokenize_feed(&raw)?;
                self.store.save_feed(&raw).await?;
                records
            }
        };

        Ok(normalize(&records))
    }
}
