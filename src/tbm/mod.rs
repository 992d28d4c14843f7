pub mod handlers;
pub mod storage;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use handlers::*;
pub use types::*;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::TBM, get(handle_list_tbm).post(handle_create_tbm))
        .route(ApiUrls::TBM_SUMMARY, get(handle_tbm_summary))
        .route(
            ApiUrls::TBM_BY_ID,
            get(handle_get_tbm).delete(handle_delete_tbm),
        )
}
