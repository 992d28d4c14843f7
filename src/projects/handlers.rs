use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::projects;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::run_blocking;
use crate::security::AuthUser;

use super::storage::{
    apply_update, contains_pattern, db_project_to_project, load_visible_project, move_project,
    next_display_order, reorder_projects, scoped_projects, status_to_json, DbProject,
};
use super::types::{
    CreateProjectRequest, ListProjectsQuery, MoveProjectRequest, Project, QuarterStatusPatch,
    ReorderProjectsRequest, UpdateProjectRequest,
};

/// Best-effort coordinates for a new or moved site address.
async fn geocode_site(state: &AppState, address: Option<&str>) -> Option<(f64, f64)> {
    let address = address.filter(|a| !a.trim().is_empty())?;
    if !state.geocoder.is_configured() {
        return None;
    }
    match state.geocoder.geocode(address).await {
        Ok(result) => Some((result.latitude, result.longitude)),
        Err(e) => {
            warn!("Could not geocode site address '{}': {}", address, e);
            None
        }
    }
}

pub async fn handle_list_projects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let result = run_blocking(&state.conn, move |conn| {
        let mut db_query = scoped_projects(&user);

        if let Some(hq) = query.hq.filter(|s| !s.is_empty()) {
            db_query = db_query.filter(projects::managing_hq.eq(hq));
        }
        if let Some(branch) = query.branch.filter(|s| !s.is_empty()) {
            db_query = db_query.filter(projects::managing_branch.eq(branch));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let term = contains_pattern(search);
            db_query = db_query.filter(
                projects::name
                    .ilike(term.clone())
                    .or(projects::site_address.ilike(term)),
            );
        }

        let rows: Vec<DbProject> = db_query
            .order((projects::display_order.asc(), projects::name.asc()))
            .select(DbProject::as_select())
            .load(conn)?;

        let include_completed = query.include_completed.unwrap_or(true);
        Ok(rows
            .into_iter()
            .map(db_project_to_project)
            .filter(|p| include_completed || !p.is_active.completed)
            .filter(|p| query.quarter.map_or(true, |q| p.is_active.is_active_in(q)))
            .collect())
    })
    .await?;

    Ok(Json(result))
}

pub async fn handle_get_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let project = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &user, project_id)
    })
    .await?;
    Ok(Json(db_project_to_project(project)))
}

pub async fn handle_create_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    user.ensure_can_manage_projects()?;
    req.validate()?;
    user.ensure_visible(&req.managing_hq, &req.managing_branch)?;

    let coords = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => geocode_site(&state, req.site_address.as_deref()).await,
    };

    let created_by = user.id;
    let project = run_blocking(&state.conn, move |conn| {
        let now = Utc::now();
        let db_project = DbProject {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            managing_hq: req.managing_hq.trim().to_string(),
            managing_branch: req.managing_branch.trim().to_string(),
            site_address: req.site_address,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            client_name: req.client_name,
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: status_to_json(req.is_active.unwrap_or_default()),
            display_order: next_display_order(conn, &user)?,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };

        diesel::insert_into(projects::table)
            .values(&db_project)
            .execute(conn)?;
        Ok(db_project)
    })
    .await?;

    info!("Project {} '{}' created by {}", project.id, project.name, created_by);
    Ok((StatusCode::CREATED, Json(db_project_to_project(project))))
}

pub async fn handle_update_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    user.ensure_can_manage_projects()?;
    req.validate()?;

    let lookup_user = user.clone();
    let existing = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &lookup_user, project_id)
    })
    .await?;

    let address_changed = req
        .site_address
        .as_ref()
        .is_some_and(|a| existing.site_address.as_ref() != Some(a));
    let coords = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ if address_changed => geocode_site(&state, req.site_address.as_deref()).await,
        _ => None,
    };

    let project = run_blocking(&state.conn, move |conn| {
        let mut db_project = existing;
        apply_update(&mut db_project, req, coords)?;
        user.ensure_visible(&db_project.managing_hq, &db_project.managing_branch)?;
        db_project.updated_at = Utc::now();

        diesel::update(projects::table.find(project_id))
            .set(&db_project)
            .execute(conn)?;
        Ok(db_project)
    })
    .await?;

    Ok(Json(db_project_to_project(project)))
}

pub async fn handle_delete_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.ensure_can_manage_projects()?;
    let user_id = user.id;

    run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &user, project_id)?;
        diesel::delete(projects::table.find(project_id)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Project {} deleted by {}", project_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(patch): Json<QuarterStatusPatch>,
) -> Result<Json<Project>, ApiError> {
    user.ensure_can_manage_projects()?;
    if patch.is_empty() {
        return Err(ApiError::Validation(
            "변경할 분기 상태를 입력해주세요.".to_string(),
        ));
    }

    let project = run_blocking(&state.conn, move |conn| {
        let mut db_project = load_visible_project(conn, &user, project_id)?;
        let next = db_project.quarter_status().apply(&patch);

        db_project.is_active = status_to_json(next);
        db_project.updated_at = Utc::now();

        diesel::update(projects::table.find(project_id))
            .set((
                projects::is_active.eq(&db_project.is_active),
                projects::updated_at.eq(db_project.updated_at),
            ))
            .execute(conn)?;
        Ok(db_project)
    })
    .await?;

    Ok(Json(db_project_to_project(project)))
}

pub async fn handle_reorder_projects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ReorderProjectsRequest>,
) -> Result<Json<Vec<Project>>, ApiError> {
    user.ensure_can_manage_projects()?;

    let result = run_blocking(&state.conn, move |conn| {
        reorder_projects(conn, &user, &req.ordered_ids)
    })
    .await?;

    Ok(Json(result.into_iter().map(db_project_to_project).collect()))
}

pub async fn handle_move_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<MoveProjectRequest>,
) -> Result<Json<Vec<Project>>, ApiError> {
    user.ensure_can_manage_projects()?;

    let result = run_blocking(&state.conn, move |conn| {
        move_project(conn, &user, project_id, req.to_index)
    })
    .await?;

    Ok(Json(result.into_iter().map(db_project_to_project).collect()))
}
