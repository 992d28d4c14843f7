pub mod handlers;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use types::*;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::INSPECTIONS,
            get(handle_list_inspections).post(handle_create_inspection),
        )
        .route(ApiUrls::INSPECTIONS_BULK_SIGN, post(handle_bulk_sign))
        .route(ApiUrls::INSPECTION_SIGN, post(handle_sign_inspection))
}
