pub mod client;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;
use crate::security::AuthUser;

pub use client::{address_candidates, AddressType, GeocodeError, GeocodeResult, VWorldClient};

#[derive(Debug, Deserialize)]
pub struct GeocodeRequest {
    pub address: String,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route(ApiUrls::GEOCODING, post(handle_geocode))
}

pub async fn handle_geocode(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResult>, ApiError> {
    if req.address.trim().is_empty() {
        return Err(ApiError::Validation("주소를 입력해주세요.".to_string()));
    }
    let result = state.geocoder.geocode(&req.address).await?;
    Ok(Json(result))
}
