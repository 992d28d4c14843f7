use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{kst, run_blocking, today_kst, DbConn};
use crate::heat_wave::storage::{db_check_to_check, list_checks};
use crate::heat_wave::HeatWaveFilter;
use crate::inspections::storage::{db_inspection_to_inspection, list_inspections};
use crate::inspections::{InspectionFilter, InspectionStatus};
use crate::projects::storage::{load_ordered_projects, DbProject};
use crate::security::AuthUser;
use crate::tbm::storage::list_tbm;
use crate::tbm::TbmFilter;

use super::export::{col, Cell, ExportFormat, Table};

/// `format=xlsx|csv|pdf`, read alongside the list filters.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

struct SiteInfo {
    hq: String,
    branch: String,
    name: String,
}

fn site_index(conn: &mut DbConn, user: &AuthUser) -> Result<HashMap<Uuid, SiteInfo>, ApiError> {
    Ok(load_ordered_projects(conn, user)?
        .into_iter()
        .map(|p: DbProject| {
            (
                p.id,
                SiteInfo {
                    hq: p.managing_hq,
                    branch: p.managing_branch,
                    name: p.name,
                },
            )
        })
        .collect())
}

fn site_cells(sites: &HashMap<Uuid, SiteInfo>, project_id: Uuid) -> [Cell; 3] {
    match sites.get(&project_id) {
        Some(site) => [
            site.hq.clone().into(),
            site.branch.clone().into(),
            site.name.clone().into(),
        ],
        None => [Cell::Empty, Cell::Empty, Cell::Empty],
    }
}

fn check_mark(done: bool) -> Cell {
    Cell::from(if done { "O" } else { "X" })
}

fn local_time(ts: Option<DateTime<Utc>>) -> Cell {
    ts.map(|t| t.with_timezone(&kst()).format("%Y-%m-%d %H:%M").to_string())
        .into()
}

/// Reads the configured font when the export is a PDF.
fn load_pdf_font(format: ExportFormat, path: Option<&Path>) -> Result<Option<Vec<u8>>, ApiError> {
    if format != ExportFormat::Pdf {
        return Ok(None);
    }
    let path = path.ok_or_else(|| ApiError::NotConfigured("PDF 글꼴".to_string()))?;
    std::fs::read(path)
        .map(Some)
        .map_err(|e| ApiError::Internal(format!("PDF font {}: {}", path.display(), e)))
}

fn attachment(name: &str, format: ExportFormat, body: Vec<u8>) -> impl IntoResponse {
    let filename = format!("{}_{}.{}", name, today_kst().format("%Y%m%d"), format.extension());
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        filename,
        urlencoding::encode(&filename)
    );
    info!("Exported {} ({} bytes)", filename, body.len());
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
}

pub async fn handle_export_tbm(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(export): Query<ExportQuery>,
    Query(filter): Query<TbmFilter>,
) -> Result<impl IntoResponse, ApiError> {
    filter.validate()?;
    let format = export.format;
    let font_path = state.config.reports.pdf_font_path.clone();
    let body = run_blocking(&state.conn, move |conn| {
        let font = load_pdf_font(format, font_path.as_deref())?;
        let sites = site_index(conn, &user)?;
        let rows = list_tbm(conn, &user, &filter)?;

        let mut table = Table::new(
            "TBM",
            vec![
                col("회의일", 12.0),
                col("본부", 12.0),
                col("지사", 12.0),
                col("현장명", 28.0),
                col("진행자", 10.0),
                col("참석인원", 9.0),
                col("작업내용", 40.0),
                col("위험요인", 40.0),
                col("안전대책", 40.0),
                col("전달사항", 30.0),
            ],
        );
        for row in rows {
            let mut cells = vec![Cell::Text(row.meeting_date.to_string())];
            cells.extend(site_cells(&sites, row.project_id));
            cells.extend([
                Cell::from(row.leader_name),
                Cell::from(row.attendee_count),
                Cell::from(row.work_content),
                Cell::from(row.risk_factors),
                Cell::from(row.safety_measures),
                Cell::from(row.remarks),
            ]);
            table.push(cells);
        }
        Ok(table.render(format, font.as_deref())?)
    })
    .await?;

    Ok(attachment("tbm", format, body))
}

pub async fn handle_export_inspections(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(export): Query<ExportQuery>,
    Query(filter): Query<InspectionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    filter.validate()?;
    let format = export.format;
    let font_path = state.config.reports.pdf_font_path.clone();
    let body = run_blocking(&state.conn, move |conn| {
        let font = load_pdf_font(format, font_path.as_deref())?;
        let sites = site_index(conn, &user)?;
        let rows = list_inspections(conn, &user, &filter)?;

        let mut table = Table::new(
            "관리자점검",
            vec![
                col("점검일", 12.0),
                col("본부", 12.0),
                col("지사", 12.0),
                col("현장명", 28.0),
                col("점검자", 10.0),
                col("구분", 14.0),
                col("점검내용", 40.0),
                col("상태", 8.0),
                col("서명자", 10.0),
                col("서명일시", 17.0),
            ],
        );
        for row in rows.into_iter().map(db_inspection_to_inspection) {
            let status = match row.status {
                InspectionStatus::Pending => "미서명",
                InspectionStatus::Signed => "서명완료",
            };
            let mut cells = vec![Cell::Text(row.inspection_date.to_string())];
            cells.extend(site_cells(&sites, row.project_id));
            cells.extend([
                Cell::from(row.inspector_name),
                Cell::from(row.category),
                Cell::from(row.findings),
                Cell::from(status),
                Cell::from(row.signer_name),
                local_time(row.signed_at),
            ]);
            table.push(cells);
        }
        Ok(table.render(format, font.as_deref())?)
    })
    .await?;

    Ok(attachment("inspections", format, body))
}

pub async fn handle_export_heat_wave(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(export): Query<ExportQuery>,
    Query(filter): Query<HeatWaveFilter>,
) -> Result<impl IntoResponse, ApiError> {
    filter.validate()?;
    let format = export.format;
    let font_path = state.config.reports.pdf_font_path.clone();
    let body = run_blocking(&state.conn, move |conn| {
        let font = load_pdf_font(format, font_path.as_deref())?;
        let sites = site_index(conn, &user)?;
        let rows = list_checks(conn, &user, &filter)?;

        let mut table = Table::new(
            "폭염점검",
            vec![
                col("점검일", 12.0),
                col("본부", 12.0),
                col("지사", 12.0),
                col("현장명", 28.0),
                col("기온(°C)", 9.0),
                col("체감온도(°C)", 11.0),
                col("경보단계", 11.0),
                col("물", 6.0),
                col("그늘", 6.0),
                col("휴식", 6.0),
                col("작업시간 조정", 12.0),
                col("응급조치", 9.0),
                col("이행률(%)", 10.0),
                col("비고", 30.0),
            ],
        );
        for check in rows.into_iter().map(db_check_to_check) {
            let mut cells = vec![Cell::Text(check.check_date.to_string())];
            cells.extend(site_cells(&sites, check.project_id));
            cells.extend([
                Cell::from(check.temperature),
                Cell::from(check.feels_like),
                Cell::from(check.alert_level.label()),
                check_mark(check.checklist.water_supplied),
                check_mark(check.checklist.shade_available),
                check_mark(check.checklist.rest_provided),
                check_mark(check.checklist.work_adjusted),
                check_mark(check.checklist.emergency_ready),
                Cell::Number((check.compliance_rate * 100.0).round()),
                Cell::from(check.notes),
            ]);
            table.push(cells);
        }
        Ok(table.render(format, font.as_deref())?)
    })
    .await?;

    Ok(attachment("heat_wave", format, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spreadsheet_formats_need_no_font() {
        assert!(load_pdf_font(ExportFormat::Xlsx, None).unwrap().is_none());
        assert!(load_pdf_font(ExportFormat::Csv, Some(Path::new("/missing.ttf")))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pdf_requires_configured_font() {
        let err = load_pdf_font(ExportFormat::Pdf, None).unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured(_)));

        let err = load_pdf_font(ExportFormat::Pdf, Some(Path::new("/nonexistent/font.ttf")))
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
