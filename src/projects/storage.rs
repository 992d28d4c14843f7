use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use log::{info, warn};
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::projects;
use crate::security::{AuthUser, UserRole};

use super::ordering::{changed_positions, move_item};
use super::types::{validate_period, Project, QuarterStatus, UpdateProjectRequest};

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(treat_none_as_null = true)]
pub struct DbProject {
    pub id: Uuid,
    pub name: String,
    pub managing_hq: String,
    pub managing_branch: String,
    pub site_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub client_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: serde_json::Value,
    pub display_order: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbProject {
    pub fn quarter_status(&self) -> QuarterStatus {
        match serde_json::from_value::<QuarterStatus>(self.is_active.clone()) {
            Ok(status) => status.normalized(),
            Err(e) => {
                warn!("Project {} has malformed is_active ({}), treating as inactive", self.id, e);
                QuarterStatus::default()
            }
        }
    }
}

pub fn db_project_to_project(db: DbProject) -> Project {
    let is_active = db.quarter_status();
    Project {
        id: db.id,
        name: db.name,
        managing_hq: db.managing_hq,
        managing_branch: db.managing_branch,
        site_address: db.site_address,
        latitude: db.latitude,
        longitude: db.longitude,
        client_name: db.client_name,
        start_date: db.start_date,
        end_date: db.end_date,
        is_active,
        display_order: db.display_order,
        created_at: db.created_at,
        updated_at: db.updated_at,
    }
}

pub fn status_to_json(status: QuarterStatus) -> serde_json::Value {
    serde_json::to_value(status.normalized()).unwrap_or_else(|_| serde_json::json!({}))
}

/// Projects the user may see, as a boxed query to filter further.
pub fn scoped_projects(user: &AuthUser) -> projects::BoxedQuery<'static, Pg> {
    let query = projects::table.into_boxed();
    if user.role == UserRole::Admin {
        return query;
    }

    let Some(hq) = user.managing_hq.clone() else {
        return query.filter(diesel::dsl::sql::<Bool>("FALSE"));
    };
    let query = query.filter(projects::managing_hq.eq(hq));

    match (user.role, user.managing_branch.clone()) {
        (UserRole::Branch | UserRole::Viewer, Some(branch)) => {
            query.filter(projects::managing_branch.eq(branch))
        }
        (UserRole::Branch, None) => query.filter(diesel::dsl::sql::<Bool>("FALSE")),
        _ => query,
    }
}

pub fn load_visible_project(
    conn: &mut PgConnection,
    user: &AuthUser,
    project_id: Uuid,
) -> Result<DbProject, ApiError> {
    let project = projects::table
        .find(project_id)
        .select(DbProject::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("현장을 찾을 수 없습니다.".to_string()))?;
    user.ensure_visible(&project.managing_hq, &project.managing_branch)?;
    Ok(project)
}

/// Ids of visible projects, optionally narrowed to one project.
pub fn visible_project_ids(
    conn: &mut PgConnection,
    user: &AuthUser,
    project_id: Option<Uuid>,
) -> Result<Vec<Uuid>, ApiError> {
    match project_id {
        Some(id) => {
            load_visible_project(conn, user, id)?;
            Ok(vec![id])
        }
        None => Ok(scoped_projects(user).select(projects::id).load(conn)?),
    }
}

pub fn load_ordered_projects(
    conn: &mut PgConnection,
    user: &AuthUser,
) -> Result<Vec<DbProject>, ApiError> {
    Ok(scoped_projects(user)
        .order((projects::display_order.asc(), projects::name.asc()))
        .select(DbProject::as_select())
        .load(conn)?)
}

/// One past the largest `display_order` among the projects the user sees.
pub fn next_display_order(conn: &mut PgConnection, user: &AuthUser) -> Result<i32, ApiError> {
    let max: Option<i32> = scoped_projects(user)
        .select(diesel::dsl::max(projects::display_order))
        .first(conn)?;
    Ok(max.map_or(0, |m| m + 1))
}

/// Copies the fields present in `req` onto `project`, trimming names.
pub fn apply_update(
    project: &mut DbProject,
    req: UpdateProjectRequest,
    coords: Option<(f64, f64)>,
) -> Result<(), ApiError> {
    req.validate()?;

    if let Some(name) = req.name {
        project.name = name.trim().to_string();
    }
    if let Some(hq) = req.managing_hq {
        project.managing_hq = hq.trim().to_string();
    }
    if let Some(branch) = req.managing_branch {
        project.managing_branch = branch.trim().to_string();
    }
    if let Some(address) = req.site_address {
        project.site_address = Some(address);
    }
    if let Some((lat, lon)) = coords {
        project.latitude = Some(lat);
        project.longitude = Some(lon);
    }
    if let Some(client) = req.client_name {
        project.client_name = Some(client);
    }
    if let Some(start) = req.start_date {
        project.start_date = Some(start);
    }
    if let Some(end) = req.end_date {
        project.end_date = Some(end);
    }
    validate_period(project.start_date, project.end_date)
}

/// `%term%` for ILIKE with the wildcard characters of `term` escaped.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Applies a full ordering chosen by the client. Duplicates are rejected,
/// unknown ids are reported together and out-of-scope ids are forbidden.
pub fn reorder_projects(
    conn: &mut PgConnection,
    user: &AuthUser,
    ordered_ids: &[Uuid],
) -> Result<Vec<DbProject>, ApiError> {
    if ordered_ids.is_empty() {
        return Err(ApiError::Validation("정렬할 현장 목록이 비어 있습니다.".to_string()));
    }
    let unique: HashSet<Uuid> = ordered_ids.iter().copied().collect();
    if unique.len() != ordered_ids.len() {
        return Err(ApiError::Validation("중복된 현장이 포함되어 있습니다.".to_string()));
    }

    let found: Vec<DbProject> = projects::table
        .filter(projects::id.eq_any(ordered_ids.to_vec()))
        .select(DbProject::as_select())
        .load(conn)?;

    let found_ids: HashSet<Uuid> = found.iter().map(|p| p.id).collect();
    let missing: Vec<Uuid> = ordered_ids
        .iter()
        .filter(|id| !found_ids.contains(id))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingIds(missing));
    }
    for project in &found {
        user.ensure_visible(&project.managing_hq, &project.managing_branch)?;
    }

    let positions: Vec<(usize, Uuid)> = ordered_ids.iter().copied().enumerate().collect();
    let updated = write_display_orders(conn, &positions)?;
    info!("Reordered {} projects", updated);

    load_ordered_projects(conn, user)
}

/// Moves one project to `to_index` in the user's ordering and persists the
/// positions that changed.
pub fn move_project(
    conn: &mut PgConnection,
    user: &AuthUser,
    project_id: Uuid,
    to_index: usize,
) -> Result<Vec<DbProject>, ApiError> {
    let mut ordered = load_ordered_projects(conn, user)?;
    let from = ordered
        .iter()
        .position(|p| p.id == project_id)
        .ok_or_else(|| ApiError::NotFound("현장을 찾을 수 없습니다.".to_string()))?;

    move_item(&mut ordered, from, to_index);

    let keys: Vec<(Uuid, i32)> = ordered.iter().map(|p| (p.id, p.display_order)).collect();
    let changed: Vec<(usize, Uuid)> = changed_positions(&keys, |k| k.1, |index| index as i32)
        .into_iter()
        .map(|(index, (id, _))| (index, id))
        .collect();
    write_display_orders(conn, &changed)?;

    let now = Utc::now();
    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(index, mut p)| {
            if p.display_order != index as i32 {
                p.display_order = index as i32;
                p.updated_at = now;
            }
            p
        })
        .collect())
}

/// Writes `display_order = index` for each `(index, id)` in one transaction.
pub fn write_display_orders(
    conn: &mut PgConnection,
    positions: &[(usize, Uuid)],
) -> Result<usize, ApiError> {
    let now = Utc::now();
    conn.transaction::<_, ApiError, _>(|conn| {
        let mut updated = 0;
        for (index, id) in positions {
            let order = i32::try_from(*index)
                .map_err(|_| ApiError::Validation("정렬 순서가 너무 큽니다.".to_string()))?;
            updated += diesel::update(projects::table.find(*id))
                .set((
                    projects::display_order.eq(order),
                    projects::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        Ok(updated)
    })
}
