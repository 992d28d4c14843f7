use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::core::config::KmaConfig;
use crate::core::shared::error::ApiError;
use crate::heat_wave::{apparent_temperature, HeatAlertLevel};

use super::grid::GridPoint;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("KMA service key is not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("KMA API error {code}: {message}")]
    Api { code: String, message: String },
    #[error("unexpected KMA response: {0}")]
    InvalidResponse(String),
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::NotConfigured => ApiError::NotConfigured("기상청 날씨".to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub nx: i32,
    pub ny: i32,
    pub base_date: String,
    pub base_time: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation_type: String,
    pub feels_like: Option<f64>,
    pub alert_level: HeatAlertLevel,
}

#[derive(Debug, Deserialize)]
struct KmaEnvelope {
    response: KmaResponse,
}

#[derive(Debug, Deserialize)]
struct KmaResponse {
    header: KmaHeader,
    #[serde(default)]
    body: Option<KmaBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KmaHeader {
    result_code: String,
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct KmaBody {
    items: KmaItems,
}

#[derive(Debug, Deserialize)]
struct KmaItems {
    #[serde(default)]
    item: Vec<KmaObservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KmaObservation {
    category: String,
    obsr_value: String,
}

pub fn precipitation_label(code: Option<f64>) -> &'static str {
    match code.map(|c| c as i64) {
        None | Some(0) => "없음",
        Some(1) => "비",
        Some(2) => "비/눈",
        Some(3) => "눈",
        Some(5) => "빗방울",
        Some(6) => "빗방울눈날림",
        Some(7) => "눈날림",
        Some(_) => "알 수 없음",
    }
}

#[derive(Debug, Clone)]
pub struct KmaClient {
    http: reqwest::Client,
    service_key: String,
    base_url: String,
}

impl KmaClient {
    pub fn new(http: reqwest::Client, config: &KmaConfig) -> Self {
        Self {
            http,
            service_key: config.service_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.service_key.is_empty()
    }

    /// Ultra-short-term observation (초단기실황) for one grid cell.
    pub async fn nowcast(
        &self,
        grid: GridPoint,
        base_date: &str,
        base_time: &str,
    ) -> Result<WeatherReport, WeatherError> {
        if !self.is_configured() {
            return Err(WeatherError::NotConfigured);
        }

        let url = format!("{}/getUltraSrtNcst", self.base_url);
        let nx = grid.nx.to_string();
        let ny = grid.ny.to_string();
        debug!("KMA nowcast request nx={} ny={} base={} {}", nx, ny, base_date, base_time);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("serviceKey", self.service_key.as_str()),
                ("pageNo", "1"),
                ("numOfRows", "1000"),
                ("dataType", "JSON"),
                ("base_date", base_date),
                ("base_time", base_time),
                ("nx", nx.as_str()),
                ("ny", ny.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("KMA API returned status {}: {}", status, text);
            return Err(WeatherError::Api {
                code: status.as_u16().to_string(),
                message: text,
            });
        }

        // Key errors come back as XML even when JSON is requested.
        let envelope: KmaEnvelope = serde_json::from_str(&text)
            .map_err(|e| WeatherError::InvalidResponse(format!("{e}: {text}")))?;

        let header = envelope.response.header;
        if header.result_code != "00" {
            return Err(WeatherError::Api {
                code: header.result_code,
                message: header.result_msg,
            });
        }

        let observations = envelope
            .response
            .body
            .map(|b| b.items.item)
            .unwrap_or_default();

        let value = |category: &str| {
            observations
                .iter()
                .find(|o| o.category == category)
                .and_then(|o| o.obsr_value.trim().parse::<f64>().ok())
        };

        let temperature = value("T1H");
        let humidity = value("REH");
        let feels_like = match (temperature, humidity) {
            (Some(t), Some(rh)) => Some((apparent_temperature(t, rh) * 10.0).round() / 10.0),
            (Some(t), None) => Some(t),
            _ => None,
        };

        Ok(WeatherReport {
            nx: grid.nx,
            ny: grid.ny,
            base_date: base_date.to_string(),
            base_time: base_time.to_string(),
            temperature,
            humidity,
            rainfall: value("RN1"),
            wind_speed: value("WSD"),
            precipitation_type: precipitation_label(value("PTY")).to_string(),
            feels_like,
            alert_level: feels_like
                .map(HeatAlertLevel::from_feels_like)
                .unwrap_or_default(),
        })
    }
}
