use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::llm::{ChatMessage, CompletionOptions, Role};
use crate::security::AuthUser;

use super::parser::{parse_labeled_sections, TbmDraft};

pub const MAX_TTS_CHARS: usize = 4096;
const MAX_CHAT_MESSAGES: usize = 50;
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const SAFETY_ASSISTANT_PROMPT: &str = "당신은 건설현장 안전관리 전문가입니다. \
산업안전보건법과 건설현장 안전수칙에 근거하여 한국어로 간결하고 정확하게 답변하세요.";

const OCR_PROMPT: &str = "이미지에 있는 모든 텍스트를 원문 그대로 추출하세요. \
표는 행 단위로 나열하고, 설명이나 요약은 덧붙이지 마세요.";

const TBM_GENERATOR_PROMPT: &str = "당신은 건설현장 TBM(작업 전 안전점검회의) 자료를 작성하는 안전관리자입니다. \
반드시 아래 네 가지 항목을 각 줄의 맨 앞에 표시하여 작성하세요.\n\
작업내용:\n위험요인:\n안전대책:\n전달사항:";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    pub image: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub work_type: String,
    #[serde(default)]
    pub site_conditions: Option<String>,
    #[serde(default)]
    pub workers: Option<u32>,
}

/// Normalizes an OCR payload into a `data:` URL after checking the base64.
pub fn image_data_url(image: &str, mime_type: Option<&str>) -> Result<String, ApiError> {
    let invalid = || ApiError::Validation("이미지 데이터가 올바르지 않습니다.".to_string());

    let (mime, payload) = match image.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
            let mime = meta.strip_suffix(";base64").ok_or_else(invalid)?;
            (mime.to_string(), payload)
        }
        None => (mime_type.unwrap_or("image/jpeg").to_string(), image),
    };

    if !mime.starts_with("image/") {
        return Err(ApiError::Validation(
            "이미지 파일만 인식할 수 있습니다.".to_string(),
        ));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD.decode(payload.as_bytes()).map_err(|_| invalid())?;
    if decoded.is_empty() {
        return Err(invalid());
    }
    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::Validation(
            "이미지 크기는 20MB 이하여야 합니다.".to_string(),
        ));
    }

    Ok(format!("data:{mime};base64,{payload}"))
}

pub fn tbm_prompt(req: &GenerateRequest) -> String {
    let mut prompt = format!("작업 종류: {}", req.work_type.trim());
    if let Some(conditions) = req.site_conditions.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("\n현장 여건: {}", conditions.trim()));
    }
    if let Some(workers) = req.workers {
        prompt.push_str(&format!("\n작업 인원: {}명", workers));
    }
    prompt
}

pub async fn handle_chat(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let history: Vec<ChatMessage> = req
        .messages
        .into_iter()
        .filter(|m| m.role != Role::System && !m.content.trim().is_empty())
        .collect();
    if history.is_empty() {
        return Err(ApiError::Validation("질문을 입력해주세요.".to_string()));
    }

    let system = req
        .system
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| SAFETY_ASSISTANT_PROMPT.to_string());
    let skip = history.len().saturating_sub(MAX_CHAT_MESSAGES);
    let messages: Vec<ChatMessage> = std::iter::once(ChatMessage::system(system))
        .chain(history.into_iter().skip(skip))
        .collect();

    let reply = state
        .llm
        .chat(&messages, &CompletionOptions::default())
        .await?;
    Ok(Json(ChatResponse { reply }))
}

pub async fn handle_ocr(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<OcrRequest>,
) -> Result<Json<OcrResponse>, ApiError> {
    if req.image.trim().is_empty() {
        return Err(ApiError::Validation("이미지를 첨부해주세요.".to_string()));
    }
    let data_url = image_data_url(req.image.trim(), req.mime_type.as_deref())?;
    let text = state.llm.vision(OCR_PROMPT, &data_url).await?;
    info!("OCR extracted {} chars", text.chars().count());
    Ok(Json(OcrResponse { text }))
}

pub async fn handle_tts(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<TtsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("읽을 내용을 입력해주세요.".to_string()));
    }
    if text.chars().count() > MAX_TTS_CHARS {
        return Err(ApiError::Validation(format!(
            "음성 변환은 {MAX_TTS_CHARS}자 이하만 가능합니다."
        )));
    }

    let audio = state.llm.speech(text, req.voice.as_deref()).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

pub async fn handle_generate(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<TbmDraft>, ApiError> {
    if req.work_type.trim().is_empty() {
        return Err(ApiError::Validation("작업 종류를 입력해주세요.".to_string()));
    }

    let text = state
        .llm
        .generate(TBM_GENERATOR_PROMPT, &tbm_prompt(&req))
        .await?;
    let draft = parse_labeled_sections(&text);
    if draft.is_empty() {
        log::warn!("Generated TBM text had no labeled sections");
    }
    Ok(Json(draft))
}
