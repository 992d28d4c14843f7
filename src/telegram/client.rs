use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::core::config::TelegramConfig;
use crate::core::shared::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram bot token not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error: {0}")]
    Api(String),
}

impl From<TelegramError> for ApiError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::NotConfigured => ApiError::NotConfigured("텔레그램".to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct TelegramSendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<TelegramSentMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramSentMessage {
    message_id: i64,
}

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            http,
            bot_token: config.bot_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }

    /// Sends an HTML message; returns the Telegram message id.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<i64, TelegramError> {
        if !self.is_configured() {
            return Err(TelegramError::NotConfigured);
        }

        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let payload = TelegramSendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .json::<TelegramResponse>()
            .await?;

        if !response.ok {
            let error_msg = response
                .description
                .unwrap_or_else(|| "Unknown Telegram API error".to_string());
            error!("Telegram API error: {}", error_msg);
            return Err(TelegramError::Api(error_msg));
        }

        let message_id = response.result.map_or(0, |m| m.message_id);
        info!("Telegram message {} sent to chat {}", message_id, chat_id);
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("A&B <현장>"), "A&amp;B &lt;현장&gt;");
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = TelegramClient::new(reqwest::Client::new(), &TelegramConfig::default());
        assert!(matches!(
            client.send_message("1", "hi").await,
            Err(TelegramError::NotConfigured)
        ));
    }
}
