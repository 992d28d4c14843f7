pub mod client;
pub mod grid;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{now_kst, run_blocking};
use crate::core::urls::ApiUrls;
use crate::projects::storage::load_visible_project;
use crate::security::AuthUser;

pub use client::{KmaClient, WeatherError, WeatherReport};
pub use grid::{nowcast_base, to_grid, GridPoint};

#[derive(Debug, Deserialize)]
pub struct WeatherRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::WEATHER_CRAWL, post(handle_weather_crawl))
        .route(ApiUrls::PROJECT_WEATHER, get(handle_project_weather))
}

pub async fn current_weather(
    state: &AppState,
    latitude: f64,
    longitude: f64,
) -> Result<WeatherReport, ApiError> {
    let grid = to_grid(latitude, longitude);
    let (base_date, base_time) = nowcast_base(now_kst());
    let report = state.weather.nowcast(grid, &base_date, &base_time).await?;
    info!(
        "Weather at grid ({}, {}): {:?}°C, feels like {:?}°C",
        grid.nx, grid.ny, report.temperature, report.feels_like
    );
    Ok(report)
}

pub async fn handle_weather_crawl(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<WeatherRequest>,
) -> Result<Json<WeatherReport>, ApiError> {
    let (latitude, longitude) = match (req.latitude, req.longitude, req.address) {
        (Some(lat), Some(lon), _) => (lat, lon),
        (_, _, Some(address)) if !address.trim().is_empty() => {
            let geocoded = state.geocoder.geocode(&address).await?;
            (geocoded.latitude, geocoded.longitude)
        }
        _ => {
            return Err(ApiError::Validation(
                "위도/경도 또는 주소를 입력해주세요.".to_string(),
            ))
        }
    };

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::Validation("좌표 범위가 올바르지 않습니다.".to_string()));
    }

    Ok(Json(current_weather(&state, latitude, longitude).await?))
}

pub async fn handle_project_weather(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<WeatherReport>, ApiError> {
    let project = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &user, project_id)
    })
    .await?;

    match (project.latitude, project.longitude) {
        (Some(lat), Some(lon)) => Ok(Json(current_weather(&state, lat, lon).await?)),
        _ => Err(ApiError::Validation(
            "현장 좌표가 등록되지 않았습니다.".to_string(),
        )),
    }
}
