pub mod handlers;
pub mod storage;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use types::{apparent_temperature, Checklist, HeatAlertLevel, HeatWaveCheck, HeatWaveFilter};

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::HEAT_WAVE,
            get(handle_list_checks).post(handle_upsert_check),
        )
        .route(ApiUrls::HEAT_WAVE_SUMMARY, get(handle_summary))
}
