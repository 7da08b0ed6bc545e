use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use food_scout::{
    Classifier, FetchConfig, Fetcher, FoodScoutPipeline, MockClassifier, OpenAiClassifier,
    PipelineConfig, ResultStore, RunReport, StoragePaths,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "food-scout", about = "Find public events likely to have free food")]
struct Cli {
    /// Directory holding the feed, outcomes, marker and digest files
    #[arg(long, env = "FOOD_SCOUT_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process the next batch of events and print the digest
    Run {
        #[arg(long, env = "FOOD_SCOUT_FEED_URL")]
        feed_url: String,

        #[arg(long, default_value_t = PipelineConfig::DEFAULT_MAX_EVENTS)]
        max_events: usize,

        /// Refetch the feed and discard stored outcomes
        #[arg(long)]
        force: bool,

        #[arg(long, default_value_t = PipelineConfig::DEFAULT_EVENT_DELAY_MS)]
        delay_ms: u64,

        /// Use the offline keyword classifier instead of a model endpoint
        #[arg(long)]
        mock_llm: bool,

        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long, env = "OPENAI_BASE_URL")]
        base_url: Option<String>,

        #[arg(long, env = "OPENAI_MODEL")]
        model: Option<String>,
    },
    /// Show what the data directory currently holds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Status => {
            let store = ResultStore::new(StoragePaths::in_dir(&cli.data_dir));
            let status = store.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Run {
            feed_url,
            max_events,
            force,
            delay_ms,
            mock_llm,
            api_key,
            base_url,
            model,
        } => {
            let classifier: Arc<dyn Classifier> = if mock_llm {
                Arc::new(MockClassifier::new("cli"))
            } else {
                let api_key = api_key.context("OPENAI_API_KEY is not set (use --mock-llm for a dry run)")?;
                let mut classifier = OpenAiClassifier::new(api_key)?;
                if let Some(base_url) = base_url {
                    classifier = classifier.with_base_url(base_url);
                }
                if let Some(model) = model {
                    classifier = classifier.with_model(model);
                }
                Arc::new(classifier)
            };

            let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);

            let config = PipelineConfig::new(feed_url, &cli.data_dir)
                .with_max_events(max_events)
                .with_force_reprocess(force)
                .with_event_delay(Duration::from_millis(delay_ms));

            info!("Starting food-scout (data dir: {})", cli.data_dir.display());
            let pipeline = FoodScoutPipeline::new(config, classifier, fetcher)?;

            let report = pipeline.run().await.map_err(|e| {
                error!("Run aborted: {}", e);
                e
            })?;

            match report {
                RunReport::Skipped { outcomes } => {
                    println!(
                        "Already processed ({} events). Use --force to reprocess.",
                        outcomes.len()
                    );
                }
                RunReport::Completed(summary) => {
                    info!(
                        "Enriched {} events this run, {} remaining",
                        summary.new_outcomes, summary.remaining
                    );
                    println!("{}", summary.digest);
                }
            }
        }
    }

    Ok(())
}
