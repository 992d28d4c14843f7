pub mod handlers;
pub mod ordering;
pub mod storage;
pub mod types;

use axum::{
    routing::{get, patch, post, put},
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
            ApiUrls::PROJECTS,
            get(handle_list_projects).post(handle_create_project),
        )
        .route(ApiUrls::PROJECTS_ORDER, put(handle_reorder_projects))
        .route(
            ApiUrls::PROJECT_BY_ID,
            get(handle_get_project)
                .put(handle_update_project)
                .delete(handle_delete_project),
        )
        .route(ApiUrls::PROJECT_STATUS, patch(handle_update_status))
        .route(ApiUrls::PROJECT_MOVE, post(handle_move_project))
}
