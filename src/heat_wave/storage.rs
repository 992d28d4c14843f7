use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::warn;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::heat_wave_checks;
use crate::projects::storage::{load_ordered_projects, visible_project_ids};
use crate::security::AuthUser;

use super::types::{
    Checklist, HeatAlertLevel, HeatWaveCheck, HeatWaveFilter, HeatWaveSummary, HeatWaveSummaryRow,
};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = heat_wave_checks)]
pub struct DbHeatWaveCheck {
    pub id: Uuid,
    pub project_id: Uuid,
    pub check_date: NaiveDate,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub alert_level: String,
    pub water_supplied: bool,
    pub shade_available: bool,
    pub rest_provided: bool,
    pub work_adjusted: bool,
    pub emergency_ready: bool,
    pub notes: Option<String>,
    pub checked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = heat_wave_checks)]
#[diesel(treat_none_as_null = true)]
pub struct HeatWaveChanges {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub alert_level: String,
    pub water_supplied: bool,
    pub shade_available: bool,
    pub rest_provided: bool,
    pub work_adjusted: bool,
    pub emergency_ready: bool,
    pub notes: Option<String>,
    pub checked_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl DbHeatWaveCheck {
    pub fn checklist(&self) -> Checklist {
        Checklist {
            water_supplied: self.water_supplied,
            shade_available: self.shade_available,
            rest_provided: self.rest_provided,
            work_adjusted: self.work_adjusted,
            emergency_ready: self.emergency_ready,
        }
    }

    pub fn changes(&self) -> HeatWaveChanges {
        HeatWaveChanges {
            temperature: self.temperature,
            feels_like: self.feels_like,
            alert_level: self.alert_level.clone(),
            water_supplied: self.water_supplied,
            shade_available: self.shade_available,
            rest_provided: self.rest_provided,
            work_adjusted: self.work_adjusted,
            emergency_ready: self.emergency_ready,
            notes: self.notes.clone(),
            checked_by: self.checked_by,
            updated_at: self.updated_at,
        }
    }
}

pub fn db_check_to_check(db: DbHeatWaveCheck) -> HeatWaveCheck {
    let checklist = db.checklist();
    let alert_level = db.alert_level.parse().unwrap_or_else(|e| {
        warn!("Heat wave check {}: {}", db.id, e);
        HeatAlertLevel::None
    });

    HeatWaveCheck {
        id: db.id,
        project_id: db.project_id,
        check_date: db.check_date,
        temperature: db.temperature,
        feels_like: db.feels_like,
        alert_level,
        compliance_rate: checklist.compliance_rate(),
        checklist,
        notes: db.notes,
        checked_by: db.checked_by,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub fn list_checks(
    conn: &mut PgConnection,
    user: &AuthUser,
    filter: &HeatWaveFilter,
) -> Result<Vec<DbHeatWaveCheck>, ApiError> {
    let project_ids = visible_project_ids(conn, user, filter.project_id)?;

    let mut query = heat_wave_checks::table
        .filter(heat_wave_checks::project_id.eq_any(project_ids))
        .into_boxed();

    if let Some(from) = filter.from {
        query = query.filter(heat_wave_checks::check_date.ge(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(heat_wave_checks::check_date.le(to));
    }
    if let Some(level) = filter.alert_level {
        query = query.filter(heat_wave_checks::alert_level.eq(level.as_str()));
    }

    Ok(query
        .order((
            heat_wave_checks::check_date.desc(),
            heat_wave_checks::created_at.desc(),
        ))
        .offset(filter.offset.unwrap_or(0).max(0))
        .limit(filter.limit.unwrap_or(500).clamp(1, 5000))
        .select(DbHeatWaveCheck::as_select())
        .load(conn)?)
}

/// Inserts the day's check for a project, or overwrites the existing one.
pub fn upsert_check(
    conn: &mut PgConnection,
    row: &DbHeatWaveCheck,
) -> Result<DbHeatWaveCheck, ApiError> {
    Ok(diesel::insert_into(heat_wave_checks::table)
        .values(row)
        .on_conflict((heat_wave_checks::project_id, heat_wave_checks::check_date))
        .do_update()
        .set(row.changes())
        .returning(DbHeatWaveCheck::as_returning())
        .get_result(conn)?)
}

/// The day's check per visible site that is not completed. Sites with no
/// check are listed with `check: None`.
pub fn daily_summary(
    conn: &mut PgConnection,
    user: &AuthUser,
    date: NaiveDate,
) -> Result<HeatWaveSummary, ApiError> {
    let projects = load_ordered_projects(conn, user)?;
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

    let checks: Vec<DbHeatWaveCheck> = heat_wave_checks::table
        .filter(heat_wave_checks::project_id.eq_any(ids))
        .filter(heat_wave_checks::check_date.eq(date))
        .select(DbHeatWaveCheck::as_select())
        .load(conn)?;
    let mut by_project: HashMap<Uuid, HeatWaveCheck> = checks
        .into_iter()
        .map(|c| (c.project_id, db_check_to_check(c)))
        .collect();

    let rows: Vec<HeatWaveSummaryRow> = projects
        .into_iter()
        .filter(|p| !p.quarter_status().completed)
        .map(|p| HeatWaveSummaryRow {
            check: by_project.remove(&p.id),
            project_id: p.id,
            project_name: p.name,
            managing_hq: p.managing_hq,
            managing_branch: p.managing_branch,
        })
        .collect();

    let rates: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.check.as_ref().map(|c| c.compliance_rate))
        .collect();
    let average_compliance = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    Ok(HeatWaveSummary {
        date,
        total_projects: rows.len(),
        checked_projects: rates.len(),
        average_compliance,
        projects: rows,
    })
}
