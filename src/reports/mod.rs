pub mod export;
pub mod handlers;
pub mod pdf;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use export::{ExportFormat, Table};
pub use pdf::to_pdf;
pub use handlers::*;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::REPORT_TBM, get(handle_export_tbm))
        .route(ApiUrls::REPORT_INSPECTIONS, get(handle_export_inspections))
        .route(ApiUrls::REPORT_HEAT_WAVE, get(handle_export_heat_wave))
}
