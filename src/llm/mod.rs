use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::shared::error::ApiError;

pub mod openai;

pub use openai::OpenAIClient;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("OpenAI API key not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("OpenAI API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("empty completion")]
    EmptyResponse,
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::NotConfigured => ApiError::NotConfigured("OpenAI".to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Reads an image (`data:` URL) with a vision model.
    async fn vision(&self, prompt: &str, image_url: &str) -> Result<String, LlmError>;

    /// Synthesizes MP3 speech.
    async fn speech(&self, text: &str, voice: Option<&str>) -> Result<Bytes, LlmError>;

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        self.chat(&messages, &CompletionOptions::default()).await
    }
}
