use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use serde_json::{json, Value};

use crate::core::config::OpenAIConfig;

use super::{ChatMessage, CompletionOptions, LLMProvider, LlmError};

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    vision_model: String,
    tts_model: String,
    tts_voice: String,
}

impl OpenAIClient {
    pub fn new(client: reqwest::Client, config: &OpenAIConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            vision_model: config.vision_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            error!("OpenAI {} failed with {}: {}", path, status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn completion(&self, body: Value) -> Result<String, LlmError> {
        let result: Value = self.post("/chat/completions", &body).await?.json().await?;
        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or("");
        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        debug!("OpenAI completion: {} chars", content.chars().count());
        Ok(content.to_string())
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.completion(json!({
            "model": self.chat_model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        }))
        .await
    }

    async fn vision(&self, prompt: &str, image_url: &str) -> Result<String, LlmError> {
        self.completion(json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image_url}},
                ],
            }],
            "max_tokens": 2000,
        }))
        .await
    }

    async fn speech(&self, text: &str, voice: Option<&str>) -> Result<Bytes, LlmError> {
        let response = self
            .post(
                "/audio/speech",
                &json!({
                    "model": self.tts_model,
                    "input": text,
                    "voice": voice.unwrap_or(&self.tts_voice),
                    "response_format": "mp3",
                }),
            )
            .await?;
        Ok(response.bytes().await?)
    }
}
