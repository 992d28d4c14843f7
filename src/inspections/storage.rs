use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::warn;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{manager_inspections, projects};
use crate::projects::storage::visible_project_ids;
use crate::security::AuthUser;

use super::types::{missing_ids, BulkSignResponse, Inspection, InspectionFilter, InspectionStatus};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = manager_inspections)]
pub struct DbInspection {
    pub id: Uuid,
    pub project_id: Uuid,
    pub inspection_date: NaiveDate,
    pub inspector_name: String,
    pub category: String,
    pub findings: Option<String>,
    pub status: String,
    pub signer_name: Option<String>,
    pub signature: Option<String>,
    pub signed_by: Option<Uuid>,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DbInspection {
    pub fn status(&self) -> InspectionStatus {
        self.status.parse().unwrap_or_else(|e| {
            warn!("Inspection {}: {}, treating as pending", self.id, e);
            InspectionStatus::Pending
        })
    }
}

pub fn db_inspection_to_inspection(db: DbInspection) -> Inspection {
    Inspection {
        status: db.status(),
        id: db.id,
        project_id: db.project_id,
        inspection_date: db.inspection_date,
        inspector_name: db.inspector_name,
        category: db.category,
        findings: db.findings,
        signer_name: db.signer_name,
        signature: db.signature,
        signed_at: db.signed_at,
        created_at: db.created_at,
    }
}

pub fn list_inspections(
    conn: &mut PgConnection,
    user: &AuthUser,
    filter: &InspectionFilter,
) -> Result<Vec<DbInspection>, ApiError> {
    let project_ids = visible_project_ids(conn, user, filter.project_id)?;

    let mut query = manager_inspections::table
        .filter(manager_inspections::project_id.eq_any(project_ids))
        .into_boxed();

    if let Some(status) = filter.status {
        query = query.filter(manager_inspections::status.eq(status.as_str()));
    }
    if let Some(from) = filter.from {
        query = query.filter(manager_inspections::inspection_date.ge(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(manager_inspections::inspection_date.le(to));
    }

    Ok(query
        .order((
            manager_inspections::inspection_date.desc(),
            manager_inspections::created_at.desc(),
        ))
        .offset(filter.offset.unwrap_or(0).max(0))
        .limit(filter.limit.unwrap_or(500).clamp(1, 5000))
        .select(DbInspection::as_select())
        .load(conn)?)
}

/// Inspections among `ids` whose project the user can see. With `lock`, the
/// rows stay locked until the surrounding transaction ends.
fn load_visible_inspections(
    conn: &mut PgConnection,
    user: &AuthUser,
    ids: &[Uuid],
    lock: bool,
) -> Result<Vec<DbInspection>, ApiError> {
    let query = manager_inspections::table
        .inner_join(projects::table)
        .filter(manager_inspections::id.eq_any(ids.to_vec()))
        .select((
            DbInspection::as_select(),
            projects::managing_hq,
            projects::managing_branch,
        ));
    let rows: Vec<(DbInspection, String, String)> = if lock {
        query.for_update().load(conn)?
    } else {
        query.load(conn)?
    };

    Ok(rows
        .into_iter()
        .filter(|(_, hq, branch)| user.allows(hq, branch))
        .map(|(inspection, _, _)| inspection)
        .collect())
}

pub fn load_visible_inspection(
    conn: &mut PgConnection,
    user: &AuthUser,
    id: Uuid,
) -> Result<DbInspection, ApiError> {
    load_visible_inspections(conn, user, &[id], false)?
        .pop()
        .ok_or_else(|| ApiError::NotFound("점검 기록을 찾을 수 없습니다.".to_string()))
}

pub struct Signature<'a> {
    pub signer_name: &'a str,
    pub signature: Option<&'a str>,
    pub signed_by: Uuid,
}

fn mark_signed(
    conn: &mut PgConnection,
    ids: Vec<Uuid>,
    sig: &Signature<'_>,
) -> Result<usize, ApiError> {
    Ok(diesel::update(
        manager_inspections::table
            .filter(manager_inspections::id.eq_any(ids))
            .filter(manager_inspections::status.eq(InspectionStatus::Pending.as_str())),
    )
    .set((
        manager_inspections::status.eq(InspectionStatus::Signed.as_str()),
        manager_inspections::signer_name.eq(sig.signer_name),
        manager_inspections::signature.eq(sig.signature),
        manager_inspections::signed_by.eq(Some(sig.signed_by)),
        manager_inspections::signed_at.eq(Some(Utc::now())),
    ))
    .execute(conn)?)
}

pub fn sign_inspection(
    conn: &mut PgConnection,
    user: &AuthUser,
    id: Uuid,
    sig: &Signature<'_>,
) -> Result<DbInspection, ApiError> {
    let inspection = load_visible_inspection(conn, user, id)?;
    if inspection.status() == InspectionStatus::Signed {
        return Err(ApiError::Validation("이미 서명된 점검입니다.".to_string()));
    }

    if mark_signed(conn, vec![id], sig)? == 0 {
        return Err(ApiError::Validation("이미 서명된 점검입니다.".to_string()));
    }

    Ok(manager_inspections::table
        .find(id)
        .select(DbInspection::as_select())
        .first(conn)?)
}

/// Signs every pending inspection in `ids`. Unknown or out-of-scope ids
/// abort the whole batch.
pub fn bulk_sign(
    conn: &mut PgConnection,
    user: &AuthUser,
    ids: &[Uuid],
    sig: &Signature<'_>,
) -> Result<BulkSignResponse, ApiError> {
    conn.transaction::<_, ApiError, _>(|conn| {
        // A concurrent single sign either commits before this read or waits for us.
        let found = load_visible_inspections(conn, user, ids, true)?;
        let found_ids: Vec<Uuid> = found.iter().map(|i| i.id).collect();
        let missing = missing_ids(ids, &found_ids);
        if !missing.is_empty() {
            return Err(ApiError::MissingIds(missing));
        }

        let (pending, signed): (Vec<_>, Vec<_>) = found
            .iter()
            .partition(|i| i.status() == InspectionStatus::Pending);
        let pending: Vec<Uuid> = pending.into_iter().map(|i| i.id).collect();
        let already_signed: Vec<Uuid> = signed.into_iter().map(|i| i.id).collect();

        let updated = if pending.is_empty() {
            0
        } else {
            mark_signed(conn, pending.clone(), sig)?
        };
        if updated != pending.len() {
            return Err(ApiError::Internal(format!(
                "bulk sign updated {} of {} pending rows",
                updated,
                pending.len()
            )));
        }

        Ok(BulkSignResponse {
            signed: pending,
            already_signed,
        })
    })
}
