use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::utils::validate_list_window;

/// KMA summer apparent temperature (체감온도) from air temperature (°C) and
/// relative humidity (%), using the Stull wet-bulb approximation.
pub fn apparent_temperature(temperature: f64, humidity: f64) -> f64 {
    let t = temperature;
    let rh = humidity.clamp(0.0, 100.0);
    let wet_bulb = t * (0.151977 * (rh + 8.313659).sqrt()).atan() + (t + rh).atan()
        - (rh - 1.676331).atan()
        + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
        - 4.686035;

    -0.2442 + 0.55399 * wet_bulb + 0.45535 * t - 0.0022 * wet_bulb.powi(2)
        + 0.00278 * wet_bulb * t
        + 3.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatAlertLevel {
    #[default]
    None,
    Caution,
    Advisory,
    Warning,
}

impl HeatAlertLevel {
    pub fn from_feels_like(feels_like: f64) -> Self {
        if feels_like >= 35.0 {
            Self::Warning
        } else if feels_like >= 33.0 {
            Self::Advisory
        } else if feels_like >= 31.0 {
            Self::Caution
        } else {
            Self::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Caution => "caution",
            Self::Advisory => "advisory",
            Self::Warning => "warning",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "없음",
            Self::Caution => "관심",
            Self::Advisory => "폭염주의보",
            Self::Warning => "폭염경보",
        }
    }

    pub fn requires_notification(&self) -> bool {
        matches!(self, Self::Advisory | Self::Warning)
    }
}

impl FromStr for HeatAlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "caution" => Ok(Self::Caution),
            "advisory" => Ok(Self::Advisory),
            "warning" => Ok(Self::Warning),
            other => Err(format!("unknown heat alert level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default)]
    pub water_supplied: bool,
    #[serde(default)]
    pub shade_available: bool,
    #[serde(default)]
    pub rest_provided: bool,
    #[serde(default)]
    pub work_adjusted: bool,
    #[serde(default)]
    pub emergency_ready: bool,
}

impl Checklist {
    pub const ITEM_COUNT: usize = 5;

    fn items(&self) -> [(bool, &'static str); Self::ITEM_COUNT] {
        [
            (self.water_supplied, "물 제공"),
            (self.shade_available, "그늘 휴식공간"),
            (self.rest_provided, "휴식시간 부여"),
            (self.work_adjusted, "작업시간 조정"),
            (self.emergency_ready, "응급조치 체계"),
        ]
    }

    pub fn satisfied(&self) -> usize {
        self.items().iter().filter(|(done, _)| *done).count()
    }

    pub fn compliance_rate(&self) -> f64 {
        self.satisfied() as f64 / Self::ITEM_COUNT as f64
    }

    pub fn is_complete(&self) -> bool {
        self.satisfied() == Self::ITEM_COUNT
    }

    pub fn missing_items(&self) -> Vec<&'static str> {
        self.items()
            .iter()
            .filter(|(done, _)| !*done)
            .map(|(_, label)| *label)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatWaveCheck {
    pub id: Uuid,
    pub project_id: Uuid,
    pub check_date: NaiveDate,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub alert_level: HeatAlertLevel,
    #[serde(flatten)]
    pub checklist: Checklist,
    pub compliance_rate: f64,
    pub notes: Option<String>,
    pub checked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertHeatWaveCheckRequest {
    pub project_id: Uuid,
    pub check_date: Option<NaiveDate>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    #[serde(flatten)]
    pub checklist: Checklist,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeatWaveFilter {
    pub project_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub alert_level: Option<HeatAlertLevel>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HeatWaveFilter {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_list_window(self.from, self.to, self.offset)
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HeatWaveSummaryRow {
    pub project_id: Uuid,
    pub project_name: String,
    pub managing_hq: String,
    pub managing_branch: String,
    pub check: Option<HeatWaveCheck>,
}

#[derive(Debug, Serialize)]
pub struct HeatWaveSummary {
    pub date: NaiveDate,
    pub total_projects: usize,
    pub checked_projects: usize,
    pub average_compliance: Option<f64>,
    pub projects: Vec<HeatWaveSummaryRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apparent_temperature_known_points() {
        let at = apparent_temperature(33.0, 60.0);
        assert!((at - 33.45).abs() < 0.05, "got {at}");
        let at = apparent_temperature(30.0, 50.0);
        assert!((at - 29.53).abs() < 0.05, "got {at}");
    }

    #[test]
    fn test_apparent_temperature_rises_with_humidity() {
        assert!(apparent_temperature(32.0, 80.0) > apparent_temperature(32.0, 40.0));
    }

    #[test]
    fn test_alert_levels() {
        assert_eq!(HeatAlertLevel::from_feels_like(29.5), HeatAlertLevel::None);
        assert_eq!(HeatAlertLevel::from_feels_like(31.0), HeatAlertLevel::Caution);
        assert_eq!(HeatAlertLevel::from_feels_like(33.45), HeatAlertLevel::Advisory);
        assert_eq!(HeatAlertLevel::from_feels_like(36.4), HeatAlertLevel::Warning);
        assert!(HeatAlertLevel::Advisory.requires_notification());
        assert!(!HeatAlertLevel::Caution.requires_notification());
    }

    #[test]
    fn test_alert_level_round_trips_through_text() {
        for level in [
            HeatAlertLevel::None,
            HeatAlertLevel::Caution,
            HeatAlertLevel::Advisory,
            HeatAlertLevel::Warning,
        ] {
            assert_eq!(level.as_str().parse::<HeatAlertLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_checklist_compliance() {
        let checklist = Checklist {
            water_supplied: true,
            shade_available: true,
            rest_provided: false,
            work_adjusted: true,
            emergency_ready: false,
        };
        assert_eq!(checklist.satisfied(), 3);
        assert!((checklist.compliance_rate() - 0.6).abs() < f64::EPSILON);
        assert_eq!(checklist.missing_items(), vec!["휴식시간 부여", "응급조치 체계"]);
        assert!(!checklist.is_complete());
    }

    #[test]
    fn test_filter_window() {
        let reversed = HeatWaveFilter {
            from: NaiveDate::from_ymd_opt(2025, 8, 10),
            to: NaiveDate::from_ymd_opt(2025, 8, 1),
            ..Default::default()
        };
        assert!(matches!(reversed.validate(), Err(ApiError::Validation(_))));

        let negative = HeatWaveFilter {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_upsert_request_flattens_checklist() {
        let req: UpsertHeatWaveCheckRequest = serde_json::from_value(serde_json::json!({
            "project_id": "7d3f8f1e-2b7c-4e55-9c53-0d1e6a8b2f10",
            "temperature": 34.2,
            "water_supplied": true,
            "rest_provided": true
        }))
        .expect("parse");
        assert_eq!(req.checklist.satisfied(), 2);
        assert!(req.check_date.is_none());
    }
}
