//! Summarizer trait and the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SummarizeError, SummarizeResult};

/// The external summarization capability.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize the given text, returning the summary verbatim.
    async fn summarize(&self, text: &str) -> SummarizeResult<String>;
}

/// Summarizer client configuration.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Chat-completion endpoint URL
    pub api_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Total attempts including the first (default 3)
    pub max_attempts: u32,
    /// Base delay for exponential backoff (default 2s)
    pub base_delay: Duration,
    /// Per-attempt request timeout (default 60s)
    pub request_timeout: Duration,
    /// Sampling temperature; low for focused summaries
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.x.ai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "grok-2-latest".to_string(),
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

impl SummarizerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("SUMMARIZER_API_URL").unwrap_or(defaults.api_url),
            api_key: std::env::var("SUMMARIZER_API_KEY").unwrap_or_default(),
            model: std::env::var("SUMMARIZER_MODEL").unwrap_or(defaults.model),
            max_attempts: std::env::var("SUMMARIZER_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            base_delay: Duration::from_millis(
                std::env::var("SUMMARIZER_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            request_timeout: Duration::from_secs(
                std::env::var("SUMMARIZER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Delay before the retry following attempt `attempt` (1-based).
    fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP summarizer against a chat-completion endpoint.
pub struct HttpSummarizer {
    config: SummarizerConfig,
    client: Client,
}

impl HttpSummarizer {
    /// Create a new client.
    pub fn new(config: SummarizerConfig) -> SummarizeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SummarizeError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create from environment variables. Requires `SUMMARIZER_API_KEY`.
    pub fn from_env() -> SummarizeResult<Self> {
        let config = SummarizerConfig::from_env();
        if config.api_key.is_empty() {
            return Err(SummarizeError::Config(
                "SUMMARIZER_API_KEY is not set".to_string(),
            ));
        }
        Self::new(config)
    }

    fn prompt(text: &str) -> String {
        format!(
            "Please summarize the following text concisely while preserving \
             the key information:\n\n{text}\n\nSummary:"
        )
    }

    async fn attempt(&self, text: &str) -> SummarizeResult<String> {
        let prompt = Self::prompt(text);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful assistant that specializes in \
                              summarizing documents.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizeError::transient(e.to_string()))?;

        let status = response.status();
        debug!("Summarizer API response status: {}", status);

        if status.is_server_error() || status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::transient(format!(
                "status {}: {}",
                status,
                truncate(&body, 500)
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                body: truncate(&body, 500).to_string(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::malformed(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SummarizeError::malformed("response has no choices"))?;

        Ok(choice.message.content)
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, text: &str) -> SummarizeResult<String> {
        info!("Calling summarizer API with {} characters of text", text.len());

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match self.attempt(text).await {
                Ok(summary) => {
                    info!("Summary generated ({} characters)", summary.len());
                    return Ok(summary);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.delay_after_attempt(attempt);
                    warn!(
                        "Summarizer request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(SummarizeError::Exhausted {
                        attempts: max_attempts,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> SummarizerConfig {
        SummarizerConfig {
            api_url: format!("{server_uri}/v1/chat/completions"),
            api_key: "test-key".to_string(),
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            request_timeout: Duration::from_secs(5),
            ..SummarizerConfig::default()
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn returns_summary_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Hi.")))
            .mount(&server)
            .await;

        let client = HttpSummarizer::new(test_config(&server.uri())).unwrap();
        let summary = client.summarize("hello").await.unwrap();
        assert_eq!(summary, "Hi.");
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Hi.")))
            .mount(&server)
            .await;

        let client = HttpSummarizer::new(test_config(&server.uri())).unwrap();
        let summary = client.summarize("hello").await.unwrap();
        assert_eq!(summary, "Hi.");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn exhaustion_cites_attempt_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpSummarizer::new(test_config(&server.uri())).unwrap();
        let err = client.summarize("hello").await.unwrap_err();

        match &err {
            SummarizeError::Exhausted { attempts, .. } => assert_eq!(*attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("3 attempts"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn missing_choices_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = HttpSummarizer::new(test_config(&server.uri())).unwrap();
        let err = client.summarize("hello").await.unwrap_err();
        assert!(matches!(err, SummarizeError::MalformedResponse(_)));

        // Exactly one call: malformed responses are not retried.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn client_rejection_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = HttpSummarizer::new(test_config(&server.uri())).unwrap();
        let err = client.summarize("hello").await.unwrap_err();
        assert!(matches!(err, SummarizeError::Api { status: 401, .. }));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = SummarizerConfig {
            base_delay: Duration::from_secs(2),
            ..SummarizerConfig::default()
        };
        assert_eq!(config.delay_after_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_after_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_after_attempt(3), Duration::from_secs(8));
    }
}
