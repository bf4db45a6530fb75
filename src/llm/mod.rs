//! Text generation collaborator
//!
//! Everything that talks to a hosted language model goes through
//! [`TextGenerator`]. The planning pipeline and the chatbot only ever see
//! prompt text going in and either text or a classified [`GenerationError`]
//! coming out; retries and timeouts are the implementation's business.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ChatMessage;

pub mod gemini;

pub use gemini::GeminiClient;

/// A single generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    /// Role and output instructions for the model
    pub instructions: String,
    /// Earlier turns of the conversation, oldest first
    pub history: Vec<ChatMessage>,
    /// The user's message for this turn
    pub message: String,
}

impl Prompt {
    pub fn new(instructions: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            history: Vec::new(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Why a generation call produced no usable text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("no API key configured for the text generation service")]
    MissingApiKey,

    #[error("text generation request timed out")]
    Timeout,

    #[error("text generation rate limit exceeded")]
    RateLimited,

    #[error("text generation credentials rejected: {0}")]
    Unauthorized(String),

    #[error("text generation quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("text generation returned no text")]
    EmptyResponse,

    #[error("text generation failed: {0}")]
    Upstream(String),
}

impl GenerationError {
    /// Classify a non-success HTTP answer from the provider
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("{status}: {}", body.trim());
        if status == StatusCode::TOO_MANY_REQUESTS {
            GenerationError::RateLimited
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            GenerationError::Unauthorized(detail)
        } else if body.to_lowercase().contains("quota") {
            GenerationError::QuotaExceeded(detail)
        } else {
            GenerationError::Upstream(detail)
        }
    }

    /// Message suitable for showing to the traveller
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::MissingApiKey => {
                "⚠️ API Key Error: Please configure a valid Gemini API key to access AI features."
            }
            GenerationError::Timeout => {
                "⚠️ Request timed out. The service might be experiencing high traffic. Please try again later."
            }
            GenerationError::RateLimited => {
                "⚠️ Rate limit exceeded. Please try again in a few minutes."
            }
            GenerationError::Unauthorized(_) => {
                "⚠️ API Key Error: Your API key appears to be invalid or has expired. Please update it in settings."
            }
            GenerationError::QuotaExceeded(_) => {
                "⚠️ API quota exceeded. Your Gemini API key has reached its usage limit."
            }
            GenerationError::EmptyResponse | GenerationError::Upstream(_) => {
                "⚠️ Error processing your request. Please try again or check your API key settings."
            }
        }
    }
}

/// A hosted model that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;

    /// Whether the generator has the credentials it needs
    fn is_configured(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::TOO_MANY_REQUESTS, "RESOURCE_EXHAUSTED quota", "Rate limit")]
    #[case(StatusCode::UNAUTHORIZED, "", "API Key Error")]
    #[case(StatusCode::FORBIDDEN, "permission denied", "API Key Error")]
    #[case(StatusCode::BAD_REQUEST, "Quota exceeded for project", "quota exceeded")]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, "boom", "Error processing")]
    fn test_status_classification(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let err = GenerationError::from_status(status, body);
        assert!(
            err.user_message().contains(expected),
            "{err:?} -> {}",
            err.user_message()
        );
    }

    #[test]
    fn test_prompt_builder() {
        let prompt = Prompt::new("be brief", "hello")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hey")]);
        assert_eq!(prompt.instructions, "be brief");
        assert_eq!(prompt.message, "hello");
        assert_eq!(prompt.history.len(), 2);
    }
}
