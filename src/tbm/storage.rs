use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{projects, tbm_submissions};
use crate::projects::storage::{load_ordered_projects, visible_project_ids};
use crate::security::AuthUser;

use super::types::{TbmFilter, TbmSubmission, TbmSummary, TbmSummaryRow};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tbm_submissions)]
pub struct DbTbmSubmission {
    pub id: Uuid,
    pub project_id: Uuid,
    pub meeting_date: NaiveDate,
    pub leader_name: String,
    pub attendee_count: i32,
    pub work_content: String,
    pub risk_factors: Option<String>,
    pub safety_measures: Option<String>,
    pub remarks: Option<String>,
    pub photo_url: Option<String>,
    pub submitted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub fn db_tbm_to_tbm(db: DbTbmSubmission) -> TbmSubmission {
    TbmSubmission {
        id: db.id,
        project_id: db.project_id,
        meeting_date: db.meeting_date,
        leader_name: db.leader_name,
        attendee_count: db.attendee_count,
        work_content: db.work_content,
        risk_factors: db.risk_factors,
        safety_measures: db.safety_measures,
        remarks: db.remarks,
        photo_url: db.photo_url,
        submitted_by: db.submitted_by,
        created_at: db.created_at,
    }
}

/// Submissions for the visible projects, newest meeting first.
pub fn list_tbm(
    conn: &mut PgConnection,
    user: &AuthUser,
    filter: &TbmFilter,
) -> Result<Vec<DbTbmSubmission>, ApiError> {
    let project_ids = visible_project_ids(conn, user, filter.project_id)?;

    let mut query = tbm_submissions::table
        .filter(tbm_submissions::project_id.eq_any(project_ids))
        .into_boxed();

    if let Some(from) = filter.from {
        query = query.filter(tbm_submissions::meeting_date.ge(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(tbm_submissions::meeting_date.le(to));
    }

    Ok(query
        .order((
            tbm_submissions::meeting_date.desc(),
            tbm_submissions::created_at.desc(),
        ))
        .offset(filter.offset.unwrap_or(0).max(0))
        .limit(filter.limit.unwrap_or(500).clamp(1, 5000))
        .select(DbTbmSubmission::as_select())
        .load(conn)?)
}

/// Loads a submission and checks the caller can see its project.
pub fn load_visible_tbm(
    conn: &mut PgConnection,
    user: &AuthUser,
    tbm_id: Uuid,
) -> Result<DbTbmSubmission, ApiError> {
    let (tbm, hq, branch): (DbTbmSubmission, String, String) = tbm_submissions::table
        .inner_join(projects::table)
        .filter(tbm_submissions::id.eq(tbm_id))
        .select((
            DbTbmSubmission::as_select(),
            projects::managing_hq,
            projects::managing_branch,
        ))
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("TBM 기록을 찾을 수 없습니다.".to_string()))?;
    user.ensure_visible(&hq, &branch)?;
    Ok(tbm)
}

/// `(submissions, attendees)` per project on one day.
pub fn daily_counts(
    conn: &mut PgConnection,
    project_ids: Vec<Uuid>,
    date: NaiveDate,
) -> Result<Vec<(Uuid, i64, Option<i64>)>, ApiError> {
    use diesel::dsl::{count_star, sum};

    Ok(tbm_submissions::table
        .filter(tbm_submissions::project_id.eq_any(project_ids))
        .filter(tbm_submissions::meeting_date.eq(date))
        .group_by(tbm_submissions::project_id)
        .select((
            tbm_submissions::project_id,
            count_star(),
            sum(tbm_submissions::attendee_count),
        ))
        .load(conn)?)
}

/// Per-site submission counts for `date`. Every visible site that is not
/// completed is listed, including sites with no submission.
pub fn daily_summary(
    conn: &mut PgConnection,
    user: &AuthUser,
    date: NaiveDate,
) -> Result<TbmSummary, ApiError> {
    let projects = load_ordered_projects(conn, user)?;
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    let counts: HashMap<Uuid, (i64, i64)> = daily_counts(conn, ids, date)?
        .into_iter()
        .map(|(id, submissions, attendees)| (id, (submissions, attendees.unwrap_or(0))))
        .collect();

    let rows: Vec<TbmSummaryRow> = projects
        .into_iter()
        .filter(|p| !p.quarter_status().completed)
        .map(|p| {
            let (submissions, attendees) = counts.get(&p.id).copied().unwrap_or((0, 0));
            TbmSummaryRow {
                project_id: p.id,
                project_name: p.name,
                managing_hq: p.managing_hq,
                managing_branch: p.managing_branch,
                submissions,
                attendees,
            }
        })
        .collect();

    Ok(TbmSummary {
        date,
        total_projects: rows.len(),
        submitted_projects: rows.iter().filter(|r| r.submissions > 0).count(),
        projects: rows,
    })
}
