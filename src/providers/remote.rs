/*!
 * HTTP chat-completion client serving both provider roles.
 *
 * One client speaks to an OpenAI-compatible chat endpoint and implements
 * both `Translator` and `Refiner`; the two roles differ only in their
 * system prompt and in how the user message is assembled. Transient
 * failures are retried with exponential backoff; client errors are not.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{
    RefinementRequest, RefinementResponse, Refiner, TranslationRequest, TranslationResponse,
    Translator,
};

/// Maximum number of retry attempts for failed requests
const MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff (in milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Chat message in an OpenAI-compatible request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    /// Role of the message author ("system" or "user")
    pub role: String,
    /// Message content
    pub content: String,
}

/// Request payload for the chat endpoint
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

/// One choice in a chat response
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Response payload from the chat endpoint
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Error payload some endpoints return in the body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for an OpenAI-compatible chat-completion endpoint
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl RemoteProvider {
    /// Create a new remote provider
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the chat endpoint, e.g. `http://localhost:11434/v1`
    /// * `model` - Model identifier
    /// * `api_key` - Optional bearer token
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            temperature: 0.3,
        }
    }

    /// Override the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Send a chat request, retrying transient failures with backoff.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            stream: false,
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {} ms", attempt + 1, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let mut builder = self.client.post(self.chat_url()).json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Chat request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(ProviderError::ConnectionError(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                return parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| {
                        ProviderError::ParseError("response contained no choices".to_string())
                    });
            }

            let status_code = status.as_u16();
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| status.to_string());

            if status_code == 429 {
                warn!("Rate limited (attempt {}): {}", attempt + 1, message);
                last_error = Some(ProviderError::RateLimitExceeded(message));
                continue;
            }

            // Server errors are retried; client errors are not
            if status_code >= 500 {
                warn!(
                    "Server error {} (attempt {}): {}",
                    status_code,
                    attempt + 1,
                    message
                );
                last_error = Some(ProviderError::ApiError {
                    status_code,
                    message,
                });
                continue;
            }

            error!("Chat endpoint rejected request: {} - {}", status_code, message);
            return Err(ProviderError::ApiError {
                status_code,
                message,
            });
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::RequestFailed("all retries exhausted".to_string())))
    }

    fn translation_system_prompt(source: &str, target: &str) -> String {
        format!(
            "You are a professional translator from {} to {}. \
             Translate the user's text faithfully. Tokens of the form \
             <<LOCK_N>> are protected placeholders: reproduce each of them \
             exactly once, unchanged, at the position where its referent \
             belongs in the translation. Respond with the translation only.",
            source, target
        )
    }

    fn refinement_system_prompt(source: &str, target: &str) -> String {
        format!(
            "You are an editor improving draft translations from {} into \
             fluent {}. The user sends a numbered list of draft segments. \
             Respond with a numbered list of exactly the same length, one \
             improved segment per number, preserving the numbering format \
             and any <<LOCK_N>> placeholders unchanged. Do not merge, \
             split, drop or reorder segments.",
            source, target
        )
    }
}

#[async_trait]
impl Translator for RemoteProvider {
    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ProviderError> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: Self::translation_system_prompt(
                    &request.source_language,
                    &request.target_language,
                ),
            },
            ChatMessage {
                role: "user".to_string(),
                content: request.text,
            },
        ];

        let text = self.chat(messages).await?;
        Ok(TranslationResponse {
            text: text.trim().to_string(),
        })
    }
}

#[async_trait]
impl Refiner for RemoteProvider {
    async fn refine(
        &self,
        request: RefinementRequest,
    ) -> Result<RefinementResponse, ProviderError> {
        let mut user_message = String::new();
        if let Some(context) = &request.source_context {
            user_message.push_str("Source text for reference:\n");
            user_message.push_str(context);
            user_message.push_str("\n\nDraft segments:\n");
        }
        user_message.push_str(&request.numbered_text);

        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: Self::refinement_system_prompt(
                    &request.source_language,
                    &request.target_language,
                ),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_message,
            },
        ];

        let text = self.chat(messages).await?;
        Ok(RefinementResponse {
            text: text.trim().to_string(),
        })
    }
}
