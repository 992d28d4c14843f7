use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::tbm_submissions;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{run_blocking, today_kst};
use crate::projects::storage::load_visible_project;
use crate::security::AuthUser;

use super::storage::{daily_summary, db_tbm_to_tbm, list_tbm, load_visible_tbm, DbTbmSubmission};
use super::types::{CreateTbmRequest, TbmFilter, TbmSubmission, TbmSummary, TbmSummaryQuery};

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub async fn handle_list_tbm(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<TbmFilter>,
) -> Result<Json<Vec<TbmSubmission>>, ApiError> {
    filter.validate()?;
    let rows = run_blocking(&state.conn, move |conn| list_tbm(conn, &user, &filter)).await?;
    Ok(Json(rows.into_iter().map(db_tbm_to_tbm).collect()))
}

pub async fn handle_get_tbm(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(tbm_id): Path<Uuid>,
) -> Result<Json<TbmSubmission>, ApiError> {
    let row = run_blocking(&state.conn, move |conn| load_visible_tbm(conn, &user, tbm_id)).await?;
    Ok(Json(db_tbm_to_tbm(row)))
}

pub async fn handle_create_tbm(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTbmRequest>,
) -> Result<(StatusCode, Json<TbmSubmission>), ApiError> {
    user.ensure_can_write()?;
    req.validate()?;

    let saved = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &user, req.project_id)?;

        let row = DbTbmSubmission {
            id: Uuid::new_v4(),
            project_id: req.project_id,
            meeting_date: req.meeting_date.unwrap_or_else(today_kst),
            leader_name: req.leader_name.trim().to_string(),
            attendee_count: req.attendee_count,
            work_content: req.work_content,
            risk_factors: non_blank(req.risk_factors),
            safety_measures: non_blank(req.safety_measures),
            remarks: non_blank(req.remarks),
            photo_url: non_blank(req.photo_url),
            submitted_by: Some(user.id),
            created_at: Utc::now(),
        };

        Ok(diesel::insert_into(tbm_submissions::table)
            .values(&row)
            .returning(DbTbmSubmission::as_returning())
            .get_result(conn)?)
    })
    .await?;

    info!(
        "TBM {} recorded for project {} on {}",
        saved.id, saved.project_id, saved.meeting_date
    );
    Ok((StatusCode::CREATED, Json(db_tbm_to_tbm(saved))))
}

pub async fn handle_delete_tbm(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(tbm_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.ensure_can_write()?;
    run_blocking(&state.conn, move |conn| {
        load_visible_tbm(conn, &user, tbm_id)?;
        diesel::delete(tbm_submissions::table.find(tbm_id)).execute(conn)?;
        Ok(())
    })
    .await?;
    info!("TBM {} deleted", tbm_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_tbm_summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<TbmSummaryQuery>,
) -> Result<Json<TbmSummary>, ApiError> {
    let date = query.date.unwrap_or_else(today_kst);

    let summary = run_blocking(&state.conn, move |conn| daily_summary(conn, &user, date)).await?;
    Ok(Json(summary))
}
