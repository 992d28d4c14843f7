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
use crate::core::shared::schema::manager_inspections;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{run_blocking, today_kst};
use crate::projects::storage::load_visible_project;
use crate::security::AuthUser;

use super::storage::{
    bulk_sign, db_inspection_to_inspection, list_inspections, sign_inspection, DbInspection,
    Signature,
};
use super::types::{
    validate_signer, BulkSignRequest, BulkSignResponse, CreateInspectionRequest, Inspection,
    InspectionFilter, InspectionStatus, SignRequest,
};

pub async fn handle_list_inspections(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<InspectionFilter>,
) -> Result<Json<Vec<Inspection>>, ApiError> {
    filter.validate()?;
    let rows =
        run_blocking(&state.conn, move |conn| list_inspections(conn, &user, &filter)).await?;
    Ok(Json(rows.into_iter().map(db_inspection_to_inspection).collect()))
}

pub async fn handle_create_inspection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateInspectionRequest>,
) -> Result<(StatusCode, Json<Inspection>), ApiError> {
    user.ensure_can_write()?;
    req.validate()?;

    let saved = run_blocking(&state.conn, move |conn| {
        load_visible_project(conn, &user, req.project_id)?;

        let row = DbInspection {
            id: Uuid::new_v4(),
            project_id: req.project_id,
            inspection_date: req.inspection_date.unwrap_or_else(today_kst),
            inspector_name: req.inspector_name.trim().to_string(),
            category: req.category.trim().to_string(),
            findings: req.findings.filter(|s| !s.trim().is_empty()),
            status: InspectionStatus::Pending.as_str().to_string(),
            signer_name: None,
            signature: None,
            signed_by: None,
            signed_at: None,
            created_by: Some(user.id),
            created_at: Utc::now(),
        };

        Ok(diesel::insert_into(manager_inspections::table)
            .values(&row)
            .returning(DbInspection::as_returning())
            .get_result(conn)?)
    })
    .await?;

    info!("Inspection {} created for project {}", saved.id, saved.project_id);
    Ok((StatusCode::CREATED, Json(db_inspection_to_inspection(saved))))
}

pub async fn handle_sign_inspection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(inspection_id): Path<Uuid>,
    Json(req): Json<SignRequest>,
) -> Result<Json<Inspection>, ApiError> {
    user.ensure_can_write()?;
    validate_signer(&req.signer_name)?;

    let signed = run_blocking(&state.conn, move |conn| {
        let sig = Signature {
            signer_name: req.signer_name.trim(),
            signature: req.signature.as_deref(),
            signed_by: user.id,
        };
        sign_inspection(conn, &user, inspection_id, &sig)
    })
    .await?;

    info!("Inspection {} signed", inspection_id);
    Ok(Json(db_inspection_to_inspection(signed)))
}

pub async fn handle_bulk_sign(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BulkSignRequest>,
) -> Result<Json<BulkSignResponse>, ApiError> {
    user.ensure_can_write()?;
    if req.ids.is_empty() {
        return Err(ApiError::Validation("서명할 점검을 선택해주세요.".to_string()));
    }
    validate_signer(&req.signer_name)?;

    let ids = req.unique_ids();
    let result = run_blocking(&state.conn, move |conn| {
        let sig = Signature {
            signer_name: req.signer_name.trim(),
            signature: req.signature.as_deref(),
            signed_by: user.id,
        };
        bulk_sign(conn, &user, &ids, &sig)
    })
    .await?;

    info!(
        "Bulk sign: {} signed, {} already signed",
        result.signed.len(),
        result.already_signed.len()
    );
    Ok(Json(result))
}
