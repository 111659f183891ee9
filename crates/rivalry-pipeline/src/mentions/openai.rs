use crate::http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Classified completion failure. The retry loop only re-attempts
/// transient variants; a rejected credential aborts the stage rather
/// than writing zero-mention records for every filing.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited (http 429)")]
    RateLimited,

    #[error("credential rejected (http {0})")]
    Unauthorized(reqwest::StatusCode),

    #[error("completion endpoint error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("no completion choices in response")]
    NoChoices,
}

impl CompletionError {
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Network(_) | CompletionError::RateLimited => true,
            CompletionError::Status { status, .. } => status.is_server_error(),
            CompletionError::Unauthorized(_) | CompletionError::NoChoices => false,
        }
    }

    /// Configuration-class failure: the key is wrong for every filing,
    /// not just this one.
    pub fn is_auth(&self) -> bool {
        matches!(self, CompletionError::Unauthorized(_))
    }
}

/// The completion endpoint behind a seam, so tests run against a
/// deterministic stub instead of a live model.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

pub struct OpenAiClient {
    api_key: String,
    http: HttpClient,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::ClientBuilder::new()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            base_url: OPENAI_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a financial analyst reading SEC annual filings. \
                              Follow the output format exactly."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: MAX_TOKENS,
            // deterministic-leaning; identical inputs can still vary
            temperature: 0.0,
        };

        debug!(model = %self.model, "completion request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CompletionError::Unauthorized(status));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::NoChoices)
    }
}

// wire types
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
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
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CompletionError::RateLimited.is_transient());
        assert!(CompletionError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
        .is_transient());
        assert!(!CompletionError::Status {
            status: reqwest::StatusCode::BAD_REQUEST,
            body: String::new(),
        }
        .is_transient());

        let auth = CompletionError::Unauthorized(reqwest::StatusCode::UNAUTHORIZED);
        assert!(!auth.is_transient());
        assert!(auth.is_auth());
        assert!(!CompletionError::NoChoices.is_auth());
    }
}
