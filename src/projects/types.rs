use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::error::ApiError;

pub(crate) fn validate_required(value: &str, label: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{label}을(를) 입력해주세요.")));
    }
    Ok(())
}

pub(crate) fn validate_period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ApiError::Validation(
                "공사 종료일은 시작일 이후여야 합니다.".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            1..=3 => Self::Q1,
            4..=6 => Self::Q2,
            7..=9 => Self::Q3,
            _ => Self::Q4,
        }
    }
}

/// Quarter-tracking state stored in `projects.is_active`.
///
/// A completed project is inactive in every quarter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterStatus {
    #[serde(default)]
    pub q1: bool,
    #[serde(default)]
    pub q2: bool,
    #[serde(default)]
    pub q3: bool,
    #[serde(default)]
    pub q4: bool,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuarterStatusPatch {
    pub q1: Option<bool>,
    pub q2: Option<bool>,
    pub q3: Option<bool>,
    pub q4: Option<bool>,
    pub completed: Option<bool>,
}

impl QuarterStatusPatch {
    pub fn is_empty(&self) -> bool {
        self.q1.is_none()
            && self.q2.is_none()
            && self.q3.is_none()
            && self.q4.is_none()
            && self.completed.is_none()
    }

    fn activates_quarter(&self) -> bool {
        [self.q1, self.q2, self.q3, self.q4].contains(&Some(true))
    }
}

impl QuarterStatus {
    pub fn completed() -> Self {
        Self {
            completed: true,
            ..Self::default()
        }
    }

    pub fn normalized(self) -> Self {
        if self.completed {
            Self::completed()
        } else {
            self
        }
    }

    /// `completed = true` wins over any quarter in the same patch.
    pub fn apply(self, patch: &QuarterStatusPatch) -> Self {
        if patch.completed == Some(true) {
            return Self::completed();
        }

        let mut next = self;
        if let Some(v) = patch.q1 {
            next.q1 = v;
        }
        if let Some(v) = patch.q2 {
            next.q2 = v;
        }
        if let Some(v) = patch.q3 {
            next.q3 = v;
        }
        if let Some(v) = patch.q4 {
            next.q4 = v;
        }
        if patch.completed == Some(false) || patch.activates_quarter() {
            next.completed = false;
        }
        next.normalized()
    }

    pub fn is_active_in(&self, quarter: Quarter) -> bool {
        match quarter {
            Quarter::Q1 => self.q1,
            Quarter::Q2 => self.q2,
            Quarter::Q3 => self.q3,
            Quarter::Q4 => self.q4,
        }
    }

    pub fn any_active(&self) -> bool {
        self.q1 || self.q2 || self.q3 || self.q4
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
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
    pub is_active: QuarterStatus,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub managing_hq: String,
    pub managing_branch: String,
    pub site_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub client_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<QuarterStatus>,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_required(&self.name, "현장명")?;
        validate_required(&self.managing_hq, "관할 본부")?;
        validate_required(&self.managing_branch, "관할 지사")?;
        validate_period(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub managing_hq: Option<String>,
    pub managing_branch: Option<String>,
    pub site_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub client_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl UpdateProjectRequest {
    /// Fields that are present must not be blank.
    pub fn validate(&self) -> Result<(), ApiError> {
        for (value, label) in [
            (&self.name, "현장명"),
            (&self.managing_hq, "관할 본부"),
            (&self.managing_branch, "관할 지사"),
        ] {
            if let Some(value) = value {
                validate_required(value, label)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub hq: Option<String>,
    pub branch: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_completed: Option<bool>,
    pub quarter: Option<Quarter>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderProjectsRequest {
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveProjectRequest {
    pub to_index: usize,
}
