use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::utils::validate_list_window;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbmSubmission {
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

#[derive(Debug, Deserialize)]
pub struct CreateTbmRequest {
    pub project_id: Uuid,
    pub meeting_date: Option<NaiveDate>,
    pub leader_name: String,
    #[serde(default)]
    pub attendee_count: i32,
    pub work_content: String,
    pub risk_factors: Option<String>,
    pub safety_measures: Option<String>,
    pub remarks: Option<String>,
    pub photo_url: Option<String>,
}

impl CreateTbmRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.leader_name.trim().is_empty() {
            return Err(ApiError::Validation("TBM 진행자를 입력해주세요.".to_string()));
        }
        if self.work_content.trim().is_empty() {
            return Err(ApiError::Validation("작업 내용을 입력해주세요.".to_string()));
        }
        if self.attendee_count < 0 {
            return Err(ApiError::Validation(
                "참석 인원은 0명 이상이어야 합니다.".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TbmFilter {
    pub project_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TbmFilter {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_list_window(self.from, self.to, self.offset)
    }
}

#[derive(Debug, Deserialize)]
pub struct TbmSummaryQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TbmSummaryRow {
    pub project_id: Uuid,
    pub project_name: String,
    pub managing_hq: String,
    pub managing_branch: String,
    pub submissions: i64,
    pub attendees: i64,
}

#[derive(Debug, Serialize)]
pub struct TbmSummary {
    pub date: NaiveDate,
    pub total_projects: usize,
    pub submitted_projects: usize,
    pub projects: Vec<TbmSummaryRow>,
}
