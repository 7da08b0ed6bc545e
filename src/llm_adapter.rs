use crate::prompts;
use crate::traits::Classifier;
use crate::types::{ChatMessage, Result, Role, ScoutError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClassifier {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ScoutError::Config("classifier API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn classifier_name(&self) -> String {
        format!("OpenAI-compatible ({})", self.model)
    }

    async fn classify(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScoutError::Classify(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Classify(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::Classify(format!("unreadable response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ScoutError::Classify("response contained no choices".to_string()))?;

        debug!(
            "Classifier {} answered in {}ms",
            self.model,
            start.elapsed().as_millis()
        );
        Ok(content)
    }
}

/// Offline classifier for dry runs and tests. Answers by keyword matching so
/// the same input always produces the same output.
pub struct MockClassifier {
    name: String,
    response_delay_ms: u64,
}

impl MockClassifier {
    const FOOD_WORDS: &'static [&'static str] = &[
        "food", "pizza", "lunch", "dinner", "breakfast", "snack", "drinks", "refreshments",
        "catered", "happy hour", "mixer", "networking", "reception", "tacos", "bbq",
    ];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    fn food_mentions(text: &str) -> Vec<&'static str> {
        let lower = text.to_lowercase();
        Self::FOOD_WORDS
            .iter()
            .copied()
            .filter(|word| lower.contains(word))
            .collect()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn classifier_name(&self) -> String {
        format!("Mock classifier ({})", self.name)
    }

    async fn classify(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        let instructions: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let body: String = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if instructions.contains(&prompts::COARSE_FILTER) {
            let answer = !Self::food_mentions(&body).is_empty();
            return Ok(answer.to_string());
        }

        if instructions.contains(&prompts::DEEP_CHECK) {
            let mentions = Self::food_mentions(&body);
            return Ok(match mentions.len() {
                0 => "unlikely, the page does not mention food".to_string(),
                1 => format!("likely, the page mentions {}", mentions[0]),
                _ => format!("very likely, the page mentions {}", mentions.join(" and ")),
            });
        }

        info!("Mock classifier producing digest");
        let digest_input = instructions.join("\n");
        let graded = digest_input.matches("\"likelihood\": \"very likely\"").count()
            + digest_input.matches("\"likelihood\": \"likely\"").count();
        Ok(format!(
            "{} event(s) look promising for free food. Check the very likely ones first.",
            graded
        ))
    }
}
