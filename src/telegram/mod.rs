pub mod client;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::security::AuthUser;

pub use client::{escape_html, TelegramClient, TelegramError};

#[derive(Debug, Deserialize)]
pub struct SendTelegramRequest {
    pub message: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendTelegramResponse {
    pub success: bool,
    pub message_id: i64,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route(ApiUrls::TELEGRAM, post(handle_send_message))
}

pub async fn handle_send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SendTelegramRequest>,
) -> Result<Json<SendTelegramResponse>, ApiError> {
    user.ensure_can_write()?;
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("전송할 메시지를 입력해주세요.".to_string()));
    }

    let chat_id = req
        .chat_id
        .filter(|c| !c.trim().is_empty())
        .or_else(|| state.config.telegram.default_chat_id.clone())
        .ok_or_else(|| ApiError::Validation("텔레그램 채팅 ID가 필요합니다.".to_string()))?;

    let message_id = state.telegram.send_message(&chat_id, &req.message).await?;
    Ok(Json(SendTelegramResponse {
        success: true,
        message_id,
    }))
}
