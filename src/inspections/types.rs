use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::utils::validate_list_window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    Pending,
    Signed,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
        }
    }
}

impl FromStr for InspectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "signed" => Ok(Self::Signed),
            other => Err(format!("unknown inspection status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub id: Uuid,
    pub project_id: Uuid,
    pub inspection_date: NaiveDate,
    pub inspector_name: String,
    pub category: String,
    pub findings: Option<String>,
    pub status: InspectionStatus,
    pub signer_name: Option<String>,
    pub signature: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInspectionRequest {
    pub project_id: Uuid,
    pub inspection_date: Option<NaiveDate>,
    pub inspector_name: String,
    pub category: String,
    pub findings: Option<String>,
}

impl CreateInspectionRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.inspector_name.trim().is_empty() {
            return Err(ApiError::Validation("점검자를 입력해주세요.".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(ApiError::Validation("점검 구분을 입력해주세요.".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub signer_name: String,
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkSignRequest {
    pub ids: Vec<Uuid>,
    pub signer_name: String,
    pub signature: Option<String>,
}

impl BulkSignRequest {
    /// Requested ids with duplicates removed, in request order.
    pub fn unique_ids(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        self.ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BulkSignResponse {
    pub signed: Vec<Uuid>,
    pub already_signed: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InspectionFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<InspectionStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl InspectionFilter {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_list_window(self.from, self.to, self.offset)
    }
}

pub fn validate_signer(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("서명자 이름을 입력해주세요.".to_string()));
    }
    Ok(())
}

/// Ids in `requested` that are absent from `found`.
pub fn missing_ids(requested: &[Uuid], found: &[Uuid]) -> Vec<Uuid> {
    requested
        .iter()
        .filter(|id| !found.contains(id))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!("signed".parse::<InspectionStatus>(), Ok(InspectionStatus::Signed));
        assert_eq!(InspectionStatus::Pending.as_str(), "pending");
        assert!("approved".parse::<InspectionStatus>().is_err());
    }

    #[test]
    fn test_unique_ids_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let req = BulkSignRequest {
            ids: vec![a, b, a],
            signer_name: "박소장".to_string(),
            signature: None,
        };
        assert_eq!(req.unique_ids(), vec![a, b]);
    }

    #[test]
    fn test_missing_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert_eq!(missing_ids(&[a, b, c], &[c, a]), vec![b]);
        assert!(missing_ids(&[a], &[a]).is_empty());
    }

    #[test]
    fn test_filter_window() {
        let reversed = InspectionFilter {
            from: NaiveDate::from_ymd_opt(2025, 8, 2),
            to: NaiveDate::from_ymd_opt(2025, 8, 1),
            ..Default::default()
        };
        assert!(matches!(reversed.validate(), Err(ApiError::Validation(_))));

        let negative = InspectionFilter {
            offset: Some(-5),
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(ApiError::Validation(_))));
        assert!(InspectionFilter::default().validate().is_ok());
    }

    #[test]
    fn test_blank_signer_rejected() {
        assert!(validate_signer(" ").is_err());
        assert!(validate_signer("박소장").is_ok());
    }
}
