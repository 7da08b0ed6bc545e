pub mod types;
pub mod tokenizer;
pub mod normalizer;
pub mod html;
pub mod prompts;
pub mod traits;
pub mod fetcher;
pub mod llm_adapter;
pub mod enrichment;
pub mod state;
pub mod digest;
pub mod pipeline;

pub use types::*;
pub use tokenizer::{tokenize, tokenize_feed, Tokenizer, TokenizerState};
pub use normalizer::{extract_url, normalize};
pub use traits::{Classifier, PageFetcher};
pub use fetcher::Fetcher;
pub use llm_adapter::{MockClassifier, OpenAiClassifier};
pub use enrichment::{enrich, Enricher};
pub use state::ResultStore;
pub use digest::summarize;
pub use pipeline::{FoodScoutPipeline, RunReport, RunSummary};
