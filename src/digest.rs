use crate::prompts;
use crate::traits::Classifier;
use crate::types::{ChatMessage, DigestReport, EnrichmentOutcome, Result, ScoutError};
use chrono::Utc;
use tracing::{error, info};

/// Messages sent for the final digest: the agent persona, then the digest
/// instruction followed by the serialized outcomes.
pub fn digest_messages(results: &[EnrichmentOutcome]) -> Result<Vec<ChatMessage>> {
    let context = serde_json::to_string_pretty(results)?;
    Ok(vec![
        ChatMessage::system(prompts::AGENT_PERSONA),
        ChatMessage::system(format!(
            "{}\n\nHere are the event summaries:\n{}",
            prompts::DIGEST,
            context
        )),
    ])
}

/// Fold every outcome into one free-text digest. The classifier's answer is
/// returned verbatim; a failure here has no fallback.
pub async fn summarize(results: &[EnrichmentOutcome], classifier: &dyn Classifier) -> Result<String> {
    info!("Creating digest for {} outcomes", results.len());

    let messages = digest_messages(results)?;
    classifier.classify(&messages).await.map_err(|e| {
        error!("Digest generation failed: {}", e);
        ScoutError::Digest(e.to_string())
    })
}

pub fn digest_report(summary: String, event_count: usize) -> DigestReport {
    DigestReport {
        summary,
        event_count,
        processed_at: Utc::now(),
    }
}
