//! Gemini API client
//!
//! Sends prompts to the `generateContent` endpoint of Google's generative
//! language API. Transient failures are retried with exponential backoff by
//! the middleware stack; everything else is classified into a
//! [`GenerationError`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::{GenerationError, Prompt, TextGenerator};
use crate::TravelianError;
use crate::config::GeminiConfig;
use crate::models::{ChatMessage, ChatRole};

/// Responses slower than this are logged as warnings
const SLOW_RESPONSE: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };
        Content::text(role, &message.content)
    }
}

/// Text generator backed by the Gemini API
pub struct GeminiClient {
    /// HTTP client with retry middleware
    client: ClientWithMiddleware,
    /// API configuration
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("Travelian/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TravelianError::api(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        if config.api_key.is_none() {
            warn!("GEMINI_API_KEY is not set, AI features will answer with a configuration notice");
        }

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(&self, prompt: &Prompt) -> GenerateContentRequest {
        let mut contents: Vec<Content> = prompt.history.iter().map(Content::from).collect();
        contents.push(Content::text("user", &prompt.message));

        GenerateContentRequest {
            system_instruction: Some(prompt.instructions.trim())
                .filter(|s| !s.is_empty())
                .map(|s| Content {
                    role: None,
                    parts: vec![Part {
                        text: Some(s.to_string()),
                    }],
                }),
            contents,
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::Upstream(error.message));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => GenerationError::Upstream(format!("prompt blocked: {reason}")),
            None => GenerationError::EmptyResponse,
        });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        debug!(finish_reason = ?candidate.finish_reason, "candidate carried no text");
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

fn transport_error(err: reqwest_middleware::Error) -> GenerationError {
    match err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => GenerationError::Timeout,
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("timed out") {
                GenerationError::Timeout
            } else {
                GenerationError::Upstream(message)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.config.model, history = prompt.history.len()))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            error!("No Gemini API key configured");
            return Err(GenerationError::MissingApiKey);
        };

        let start_time = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API returned an error");
            return Err(GenerationError::from_status(status, &body));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            GenerationError::Upstream(format!("invalid response body: {e}"))
        })?;
        let text = extract_text(parsed)?;

        let elapsed = start_time.elapsed();
        info!(
            "Generated {} characters in {:.2}s",
            text.len(),
            elapsed.as_secs_f64()
        );
        if elapsed > SLOW_RESPONSE {
            warn!("Slow Gemini response: {:.2}s", elapsed.as_secs_f64());
        }

        Ok(text)
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: Some("AIzaSyTestKey123".to_string()),
            ..GeminiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let prompt = Prompt::new("You are a travel assistant.", "Best time to visit Goa?")
            .with_history(vec![
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello! Where to?"),
            ]);
        let body = serde_json::to_value(client().build_request(&prompt)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a travel assistant."
        );
        assert!(body["systemInstruction"].get("role").is_none());
        let roles: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Best time to visit Goa?");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_blank_instructions_are_omitted() {
        let body = serde_json::to_value(client().build_request(&Prompt::new("  ", "hi"))).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "**Day 1**\n"}, {"text": "- Amber Fort"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "**Day 1**\n- Amber Fort");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(
            extract_text(response),
            Err(GenerationError::Upstream("prompt blocked: SAFETY".to_string()))
        );
    }

    #[test]
    fn test_extract_text_empty_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        assert_eq!(extract_text(response), Err(GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        assert!(!client.is_configured());
        let result = client.generate(&Prompt::new("", "hello")).await;
        assert_eq!(result, Err(GenerationError::MissingApiKey));
    }
}
