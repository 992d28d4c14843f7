pub mod handlers;
pub mod parser;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use parser::{parse_labeled_sections, TbmDraft};

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::AI_CHAT, post(handle_chat))
        .route(ApiUrls::AI_OCR, post(handle_ocr))
        .route(ApiUrls::AI_TTS, post(handle_tts))
        .route(ApiUrls::AI_GENERATE, post(handle_generate))
}
