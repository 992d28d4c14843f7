use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{run_blocking, today_kst};
use crate::projects::storage::{load_visible_project, DbProject};
use crate::security::AuthUser;

use super::storage::{daily_summary, db_check_to_check, list_checks, upsert_check, DbHeatWaveCheck};
use super::types::{
    apparent_temperature, HeatAlertLevel, HeatWaveCheck, HeatWaveFilter, HeatWaveSummary,
    SummaryQuery, UpsertHeatWaveCheckRequest,
};

/// Temperature and apparent temperature for a check, fetching live weather
/// when the request carries no reading.
async fn resolve_temperature(
    state: &AppState,
    project: &DbProject,
    req: &UpsertHeatWaveCheckRequest,
) -> (Option<f64>, Option<f64>) {
    if let Some(t) = req.temperature {
        let feels_like = req
            .humidity
            .map(|rh| (apparent_temperature(t, rh) * 10.0).round() / 10.0)
            .unwrap_or(t);
        return (Some(t), Some(feels_like));
    }

    #[cfg(feature = "weather")]
    if let (Some(lat), Some(lon)) = (project.latitude, project.longitude) {
        if state.weather.is_configured() {
            match crate::weather::current_weather(state, lat, lon).await {
                Ok(report) => return (report.temperature, report.feels_like),
                Err(e) => warn!("Weather lookup for project {} failed: {}", project.id, e),
            }
        }
    }

    #[cfg(not(feature = "weather"))]
    let _ = (state, project);

    (None, None)
}

#[cfg(feature = "telegram")]
async fn notify_heat_alert(
    state: &AppState,
    project: &DbProject,
    check: &HeatWaveCheck,
    checked_by: &str,
) {
    if !state.telegram.is_configured() {
        return;
    }
    let Some(chat_id) = state.config.telegram.default_chat_id.as_deref() else {
        return;
    };

    let missing = check.checklist.missing_items().join(", ");
    let feels_like = check
        .feels_like
        .map(|v| format!("{v:.1}°C"))
        .unwrap_or_else(|| "-".to_string());
    let text = format!(
        "<b>[{}] {}</b>\n{} / {}\n점검일: {}\n체감온도: {}\n점검자: {}\n미이행 항목: {}",
        check.alert_level.label(),
        crate::telegram::escape_html(&project.name),
        crate::telegram::escape_html(&project.managing_hq),
        crate::telegram::escape_html(&project.managing_branch),
        check.check_date,
        feels_like,
        crate::telegram::escape_html(checked_by),
        missing
    );

    if let Err(e) = state.telegram.send_message(chat_id, &text).await {
        warn!("Heat alert notification for project {} failed: {}", project.id, e);
    }
}

pub async fn handle_list_checks(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<HeatWaveFilter>,
) -> Result<Json<Vec<HeatWaveCheck>>, ApiError> {
    filter.validate()?;
    let rows = run_blocking(&state.conn, move |conn| list_checks(conn, &user, &filter)).await?;
    Ok(Json(rows.into_iter().map(db_check_to_check).collect()))
}

pub async fn handle_upsert_check(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpsertHeatWaveCheckRequest>,
) -> Result<Json<HeatWaveCheck>, ApiError> {
    user.ensure_can_write()?;
    if let Some(rh) = req.humidity {
        if !(0.0..=100.0).contains(&rh) {
            return Err(ApiError::Validation("습도는 0~100 사이여야 합니다.".to_string()));
        }
    }

    let project_id = req.project_id;
    let lookup_user = user.clone();
    let project = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &lookup_user, project_id)
    })
    .await?;

    let (temperature, feels_like) = resolve_temperature(&state, &project, &req).await;
    let alert_level = feels_like
        .map(HeatAlertLevel::from_feels_like)
        .unwrap_or_default();

    let now = Utc::now();
    let row = DbHeatWaveCheck {
        id: Uuid::new_v4(),
        project_id,
        check_date: req.check_date.unwrap_or_else(today_kst),
        temperature,
        feels_like,
        alert_level: alert_level.as_str().to_string(),
        water_supplied: req.checklist.water_supplied,
        shade_available: req.checklist.shade_available,
        rest_provided: req.checklist.rest_provided,
        work_adjusted: req.checklist.work_adjusted,
        emergency_ready: req.checklist.emergency_ready,
        notes: req.notes,
        checked_by: Some(user.id),
        created_at: now,
        updated_at: now,
    };

    let saved = run_blocking(&state.conn, move |conn| upsert_check(conn, &row)).await?;
    let check = db_check_to_check(saved);
    info!(
        "Heat wave check for project {} on {}: level={}, compliance={:.0}%",
        project.id,
        check.check_date,
        check.alert_level.as_str(),
        check.compliance_rate * 100.0
    );

    #[cfg(feature = "telegram")]
    if check.alert_level.requires_notification() && !check.checklist.is_complete() {
        notify_heat_alert(&state, &project, &check, user.display_name()).await;
    }

    Ok(Json(check))
}

pub async fn handle_summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<HeatWaveSummary>, ApiError> {
    let date = query.date.unwrap_or_else(today_kst);

    let summary = run_blocking(&state.conn, move |conn| daily_summary(conn, &user, date)).await?;
    Ok(Json(summary))
}
